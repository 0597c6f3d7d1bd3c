use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Fill DOCX certificate templates from spreadsheets
#[derive(Parser, Debug)]
#[command(name = "certgen", version)]
#[command(about = "Fill DOCX certificate templates from spreadsheets")]
pub struct Cli {
    /// Directory holding settings.json and the job store
    #[arg(long, global = true, default_value = ".certgen", env = "CERTGEN_DATA_DIR")]
    pub data_dir: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List the placeholders a template uses, after repairing split runs
    Placeholders {
        template: PathBuf,
    },

    /// Render a single certificate
    Render {
        template: PathBuf,

        /// JSON object of placeholder values
        #[arg(long)]
        values: Option<PathBuf>,

        /// A single placeholder value, repeatable
        #[arg(long = "value", value_name = "NAME=VALUE", value_parser = parse_key_val)]
        pairs: Vec<(String, String)>,

        /// PNG, JPEG or GIF placed at the QR marker
        #[arg(long)]
        qr_image: Option<PathBuf>,

        #[arg(long, short)]
        out: PathBuf,
    },

    /// Render one certificate per dataset row
    Batch {
        template: PathBuf,

        /// Excel workbook (.xlsx) or JSON array of rows
        dataset: PathBuf,

        /// JSON array of placeholder bindings
        #[arg(long)]
        mapping: Option<PathBuf>,

        /// Text encoded as each row's QR code, e.g. https://verify.example/{{CertificateNo}}
        #[arg(long)]
        qr_pattern: Option<String>,

        /// Image used as every row's QR code instead of a generated one
        #[arg(long, conflicts_with = "qr_pattern")]
        qr_image: Option<PathBuf>,

        #[arg(long, default_value = "certificates")]
        out_dir: PathBuf,

        /// Overrides the saved batch concurrency
        #[arg(long)]
        concurrency: Option<usize>,

        /// Overrides the saved row limit; 0 renders every row
        #[arg(long)]
        max_records: Option<usize>,

        /// Overrides the saved output file name pattern
        #[arg(long)]
        output_pattern: Option<String>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{}`", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing placeholder name in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(parse_key_val("Name=Asha Rao").unwrap(), ("Name".into(), "Asha Rao".into()));
        assert_eq!(parse_key_val("Url=a=b").unwrap(), ("Url".into(), "a=b".into()));
        assert!(parse_key_val("Name").is_err());
        assert!(parse_key_val("=x").is_err());
    }

    #[test]
    fn test_render_args() {
        let cli = Cli::try_parse_from([
            "certgen", "render", "t.docx", "--value", "Name=Asha", "--value", "Course=Rust", "-o", "out.docx",
        ])
        .unwrap();
        match cli.command {
            Command::Render { pairs, out, values, .. } => {
                assert_eq!(pairs.len(), 2);
                assert_eq!(out, PathBuf::from("out.docx"));
                assert!(values.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_batch_args() {
        let cli = Cli::try_parse_from([
            "certgen",
            "--data-dir",
            "/tmp/certs",
            "batch",
            "t.docx",
            "rows.xlsx",
            "--concurrency",
            "8",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/certs"));
        match cli.command {
            Command::Batch {
                concurrency, out_dir, max_records, ..
            } => {
                assert_eq!(concurrency, Some(8));
                assert_eq!(out_dir, PathBuf::from("certificates"));
                assert_eq!(max_records, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_batch_qr_sources_are_exclusive() {
        let cli = Cli::try_parse_from([
            "certgen",
            "batch",
            "t.docx",
            "rows.json",
            "--qr-pattern",
            "https://verify.example/{{CertificateNo}}",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Batch { qr_pattern: Some(_), qr_image: None, .. }));

        let both = Cli::try_parse_from([
            "certgen",
            "batch",
            "t.docx",
            "rows.json",
            "--qr-pattern",
            "{{CertificateNo}}",
            "--qr-image",
            "qr.png",
        ]);
        assert!(both.is_err());
    }

    #[test]
    fn test_render_requires_out() {
        assert!(Cli::try_parse_from(["certgen", "render", "t.docx"]).is_err());
    }
}
