//! Headless brief tooling: validate a Brief, solve its layout, render it.
//!
//! The LLM path never runs here; this binary exists for deterministic
//! inspection of the layout and render stages, which is also how layout
//! regressions get reproduced from persisted briefs.

use slidesmith::core::{Brief, Error as CoreError};
use slidesmith::layout::text::{FontMetricsTextMeasurer, FontRegistry, HeuristicTextMeasurer, TextMeasurer};
use slidesmith::layout::{SolvedLayout, solve};
use slidesmith::render;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Json(serde_json::Error),
    Core(CoreError),
    Render(render::Error),
    InvalidBrief(Vec<String>),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Core(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
            CliError::InvalidBrief(problems) => {
                writeln!(f, "brief failed validation:")?;
                for problem in problems {
                    writeln!(f, "  - {problem}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<CoreError> for CliError {
    fn from(value: CoreError) -> Self {
        Self::Core(value)
    }
}

impl From<render::Error> for CliError {
    fn from(value: render::Error) -> Self {
        Self::Render(value)
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Validate,
    Layout,
    Render,
}

impl FromStr for Command {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "validate" => Ok(Command::Validate),
            "layout" => Ok(Command::Layout),
            "render" => Ok(Command::Render),
            _ => Err(CliError::Usage("unknown command; expected validate | layout | render")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum RenderFormat {
    #[default]
    Svg,
    Slide,
    Png,
}

impl FromStr for RenderFormat {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "svg" => Ok(RenderFormat::Svg),
            "slide" | "pptx" => Ok(RenderFormat::Slide),
            "png" => Ok(RenderFormat::Png),
            _ => Err(CliError::Usage("unknown format; expected svg | slide | png")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum MeasurerKind {
    #[default]
    Metrics,
    Heuristic,
}

impl FromStr for MeasurerKind {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metrics" => Ok(MeasurerKind::Metrics),
            "heuristic" => Ok(MeasurerKind::Heuristic),
            _ => Err(CliError::Usage("unknown measurer; expected metrics | heuristic")),
        }
    }
}

#[derive(Debug, Default)]
struct Args {
    command: Option<Command>,
    input: Option<String>,
    output: Option<String>,
    format: RenderFormat,
    measurer: MeasurerKind,
    pretty: bool,
}

const USAGE: &str = "usage: slidesmith <validate|layout|render> [options]

Reads a Brief as JSON from --input FILE or stdin.

options:
  -i, --input FILE      brief JSON (default: stdin)
  -o, --output FILE     output path (default: stdout)
  -f, --format FORMAT   render format: svg | slide | png (default: svg)
      --measurer KIND   text measurer: metrics | heuristic (default: metrics)
      --pretty          pretty-print layout JSON
";

fn parse_args() -> Result<Args, CliError> {
    let mut args = Args::default();
    let mut raw = std::env::args().skip(1);

    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "-i" | "--input" => {
                args.input = Some(raw.next().ok_or(CliError::Usage("--input needs a path"))?);
            }
            "-o" | "--output" => {
                args.output = Some(raw.next().ok_or(CliError::Usage("--output needs a path"))?);
            }
            "-f" | "--format" => {
                let value = raw.next().ok_or(CliError::Usage("--format needs a value"))?;
                args.format = value.parse()?;
            }
            "--measurer" => {
                let value = raw.next().ok_or(CliError::Usage("--measurer needs a value"))?;
                args.measurer = value.parse()?;
            }
            "--pretty" => args.pretty = true,
            "-h" | "--help" => return Err(CliError::Usage(USAGE)),
            other => {
                if args.command.is_none() && !other.starts_with('-') {
                    args.command = Some(other.parse()?);
                } else {
                    return Err(CliError::Usage("unexpected argument; see --help"));
                }
            }
        }
    }

    Ok(args)
}

fn read_brief(input: Option<&str>) -> Result<Brief, CliError> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let mut brief: Brief = serde_json::from_str(&text)?;
    brief.normalize();
    let problems = brief.validate();
    if !problems.is_empty() {
        return Err(CliError::InvalidBrief(problems));
    }
    Ok(brief)
}

fn make_measurer(kind: MeasurerKind) -> Box<dyn TextMeasurer> {
    match kind {
        MeasurerKind::Metrics => Box::new(FontMetricsTextMeasurer::new(FontRegistry::default())),
        MeasurerKind::Heuristic => Box::new(HeuristicTextMeasurer),
    }
}

fn solve_brief(brief: &Brief, kind: MeasurerKind) -> Result<SolvedLayout, CliError> {
    let measurer = make_measurer(kind);
    Ok(solve(brief, measurer.as_ref())?)
}

fn write_output(output: Option<&str>, bytes: &[u8]) -> Result<(), CliError> {
    match output {
        Some(path) => std::fs::write(path, bytes)?,
        None => {
            use std::io::Write;
            std::io::stdout().write_all(bytes)?;
        }
    }
    Ok(())
}

fn run() -> Result<(), CliError> {
    let args = parse_args()?;
    let command = args.command.ok_or(CliError::Usage(USAGE))?;
    let brief = read_brief(args.input.as_deref())?;

    match command {
        Command::Validate => {
            eprintln!(
                "ok: {} with {} entities",
                brief.diagram_type,
                brief.entities.len()
            );
            Ok(())
        }
        Command::Layout => {
            let solved = solve_brief(&brief, args.measurer)?;
            for warning in &solved.warnings {
                eprintln!("warning: {warning:?}");
            }
            let json = if args.pretty {
                serde_json::to_string_pretty(&solved.layout)?
            } else {
                serde_json::to_string(&solved.layout)?
            };
            write_output(args.output.as_deref(), json.as_bytes())
        }
        Command::Render => {
            let solved = solve_brief(&brief, args.measurer)?;
            for warning in &solved.warnings {
                eprintln!("warning: {warning:?}");
            }
            let bytes = match args.format {
                RenderFormat::Svg => render::svg::render_svg(&solved.layout).into_bytes(),
                RenderFormat::Slide => render::slide::render_slide(&solved.layout)?,
                RenderFormat::Png => {
                    #[cfg(feature = "raster")]
                    {
                        render::raster::render_png(&solved.layout)?
                    }
                    #[cfg(not(feature = "raster"))]
                    {
                        return Err(CliError::Render(render::Error::RasterUnavailable));
                    }
                }
            };
            write_output(args.output.as_deref(), &bytes)
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
