//! Conversion engine boundary
//!
//! Il motore di conversione PDF → DOCX e' opaco: il servizio conosce solo
//! il trait [`DocumentConverter`]. L'implementazione di produzione
//! ([`CommandConverter`]) esegue un programma esterno.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::config::{Config, ConverterPreset};

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Failed(String),

    #[error("output file was not produced: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Capacita' di conversione: legge `input` per intero e materializza `output`
/// completo, oppure fallisce.
pub trait DocumentConverter: Send + Sync {
    fn name(&self) -> &str;

    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError>;
}

/// Converte lanciando un programma esterno.
///
/// Gli argomenti sono un template: `{input}`, `{output}` e `{outdir}`
/// vengono sostituiti con i path del job.
#[derive(Debug, Clone)]
pub struct CommandConverter {
    program: String,
    args: Vec<String>,
}

impl CommandConverter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `pdf2docx convert <input> <output>`
    pub fn pdf2docx() -> Self {
        Self::new(
            "pdf2docx",
            vec!["convert".into(), "{input}".into(), "{output}".into()],
        )
    }

    /// LibreOffice headless: scrive `<outdir>/<stem>.docx`, che coincide con
    /// il path di output del job perche' input e output condividono il token.
    pub fn libreoffice() -> Self {
        Self::new(
            "soffice",
            vec![
                "--headless".into(),
                "--infilter=writer_pdf_import".into(),
                "--convert-to".into(),
                "docx".into(),
                "--outdir".into(),
                "{outdir}".into(),
                "{input}".into(),
            ],
        )
    }

    /// Preset scelto in configurazione, con eventuali override di programma e
    /// argomenti.
    pub fn from_config(config: &Config) -> Self {
        let mut converter = match config.converter {
            ConverterPreset::Pdf2Docx => Self::pdf2docx(),
            ConverterPreset::LibreOffice => Self::libreoffice(),
        };
        if let Some(program) = &config.converter_program {
            converter.program = program.clone();
        }
        if let Some(args) = &config.converter_args {
            converter.args = args.clone();
        }
        converter
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Verifica che il programma sia lanciabile
    pub fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--help")
            .output()
            .map(|_| true)
            .unwrap_or(false)
    }

    fn render_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let outdir = output.parent().unwrap_or_else(|| Path::new("."));
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input}", &input.to_string_lossy())
                    .replace("{output}", &output.to_string_lossy())
                    .replace("{outdir}", &outdir.to_string_lossy())
            })
            .collect()
    }
}

impl DocumentConverter for CommandConverter {
    fn name(&self) -> &str {
        &self.program
    }

    fn convert(&self, input: &Path, output: &Path) -> Result<(), ConversionError> {
        let args = self.render_args(input, output);

        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| {
                ConversionError::Unavailable(format!("cannot run {}: {}", self.program, e))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let detail = stderr.trim();
            return Err(ConversionError::Failed(if detail.is_empty() {
                format!("{} exited with {}", self.program, result.status)
            } else {
                format!("{} failed: {}", self.program, detail)
            }));
        }

        if !output.exists() {
            return Err(ConversionError::MissingOutput(output.to_path_buf()));
        }

        Ok(())
    }
}
