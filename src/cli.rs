use crate::config::load_config;
use crate::layout::LayoutEngine;
use crate::layout_dump::{write_layout_dump, SlideLayoutDump};
use crate::template::{self, SlideData, Template};
use crate::text_metrics::{FontMeasurer, StaticImageProbe};
use crate::theme::Theme;
use anyhow::{Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "sldr", version, about = "Slide layout engine: resolve a template against slide data")]
pub struct Args {
    /// Template file (.json5), builtin template id, or '-' for stdin
    #[arg(short = 't', long = "template")]
    pub template: String,

    /// Slide data JSON file. Empty slide when omitted.
    #[arg(short = 'd', long = "data")]
    pub data: Option<PathBuf>,

    /// Output file for the layout dump. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Engine config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Theme preset name
    #[arg(long = "theme", default_value = "modern")]
    pub theme: String,

    /// Template parameter override, KEY=VALUE. Repeatable.
    #[arg(long = "param", value_parser = parse_param)]
    pub params: Vec<(String, f64)>,
}

fn parse_param(raw: &str) -> Result<(String, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got \"{raw}\""))?;
    let value: f64 = value
        .parse()
        .map_err(|_| format!("invalid numeric value in \"{raw}\""))?;
    Ok((key.to_string(), value))
}

pub fn run() -> Result<()> {
    let _ = env_logger::try_init();
    let args = Args::parse();

    let theme = Theme::by_name(&args.theme)
        .ok_or_else(|| anyhow::anyhow!("unknown theme \"{}\"", args.theme))?;
    let config = load_config(args.config.as_deref())?;
    let template = load_template_arg(&args.template, &theme)?;
    let data = load_data(args.data.as_deref())?;

    let measurer = FontMeasurer::new();
    let probe = StaticImageProbe::default();
    let engine = LayoutEngine {
        theme: &theme,
        config: &config,
        measurer: &measurer,
        probe: &probe,
    };

    let mut overrides = BTreeMap::new();
    for (key, value) in &args.params {
        overrides.insert(key.clone(), *value);
    }
    let layout = engine.compute_with_overrides(&template, &data, &overrides)?;

    match args.output.as_deref() {
        Some(path) => write_layout_dump(path, &layout, &template.id)?,
        None => {
            let dump = SlideLayoutDump::from_layout(&layout, &template.id);
            serde_json::to_writer_pretty(io::stdout().lock(), &dump)?;
            println!();
        }
    }
    Ok(())
}

fn load_template_arg(arg: &str, theme: &Theme) -> Result<Template> {
    if arg == "-" {
        let mut source = String::new();
        io::stdin().read_to_string(&mut source)?;
        return template::parse_template(&source, theme);
    }
    let path = Path::new(arg);
    if path.exists() {
        return template::load_template(path, theme);
    }
    if let Some(builtin) = template::builtin_template_by_id(arg) {
        return Ok(builtin.clone());
    }
    Err(anyhow::anyhow!(
        "\"{arg}\" is neither a template file nor a builtin template id"
    ))
}

fn load_data(path: Option<&Path>) -> Result<SlideData> {
    let Some(path) = path else {
        return Ok(SlideData::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read data file {}", path.display()))?;
    let data: SlideData =
        serde_json::from_str(&contents).context("data file does not match the expected shape")?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_parser_accepts_key_value() {
        assert_eq!(
            parse_param("SIDE_PADDING=48").unwrap(),
            ("SIDE_PADDING".to_string(), 48.0)
        );
        assert!(parse_param("SIDE_PADDING").is_err());
        assert!(parse_param("K=abc").is_err());
    }

    #[test]
    fn builtin_id_resolves_without_a_file() {
        let theme = Theme::modern();
        let template = load_template_arg("pyramid-basic", &theme).unwrap();
        assert_eq!(template.id, "pyramid-basic");
    }
}
