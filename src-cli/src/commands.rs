//! Subcommand handlers

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use base64::Engine;
use docx_template::{extract_from_docx, PlaceholderValues, RenderContext, Renderer};
use mail_merge::{
    load_dataset, BatchGenerator, BatchStatus, CancellationFlag, FieldMapping, FixedImage, QrCodeEncoder, QrEncoder,
    QrPattern,
};
use store::{
    CertificateRecord, CertificateSettings, DatasetRecord, GenerationJob, JsonFileRepository, Repository,
    SettingsManager, TemplateRecord,
};

/// Batch arguments after parsing
pub struct BatchArgs {
    pub template: PathBuf,
    pub dataset: PathBuf,
    pub mapping: Option<PathBuf>,
    pub qr_pattern: Option<String>,
    pub qr_image: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub concurrency: Option<usize>,
    pub max_records: Option<usize>,
    pub output_pattern: Option<String>,
}

pub fn placeholders(template: &Path) -> Result<()> {
    let bytes = read_file(template)?;
    for name in extract_from_docx(&bytes)? {
        println!("{}", name);
    }
    Ok(())
}

pub async fn render(
    data_dir: &Path,
    template: &Path,
    values_file: Option<&Path>,
    pairs: Vec<(String, String)>,
    qr_image: Option<&Path>,
    out: &Path,
) -> Result<()> {
    let settings = load_settings(data_dir).await?;
    let renderer = Renderer::with_options(settings.render)?;

    let mut values = match values_file {
        Some(path) => values_from_json(&std::fs::read_to_string(path).with_context(|| {
            format!("Failed to read values from {}", path.display())
        })?)?,
        None => PlaceholderValues::new(),
    };
    values.extend(pairs);

    let bytes = read_file(template)?;
    let qr = qr_image.map(image_payload).transpose()?;
    let mut ctx = RenderContext::new(&bytes, &values);
    if let Some(payload) = qr.as_deref() {
        ctx = ctx.with_qr_image(payload);
    }

    let rendered = renderer.render(&ctx)?;
    for name in &rendered.unmatched {
        tracing::warn!("No value for {{{{{}}}}}, left as text", name);
    }
    if let Some(placement) = rendered.qr_placement {
        tracing::info!("QR image placed: {:?}", placement);
    }
    write_file(out, &rendered.data)?;
    println!("Wrote {} ({} bytes)", out.display(), rendered.size_bytes);
    Ok(())
}

pub async fn batch(data_dir: &Path, args: BatchArgs) -> Result<()> {
    let settings = load_settings(data_dir).await?;
    let mut options = settings.batch.clone();
    if let Some(concurrency) = args.concurrency {
        options = options.with_concurrency(concurrency.max(1));
    }
    if let Some(max) = args.max_records {
        options = options.with_max_records(max);
    }
    if let Some(pattern) = args.output_pattern {
        options = options.with_output_pattern(pattern);
    }

    let store_dir = data_dir.join("store");
    let templates: JsonFileRepository<TemplateRecord> = JsonFileRepository::open(&store_dir)?;
    let datasets: JsonFileRepository<DatasetRecord> = JsonFileRepository::open(&store_dir)?;
    let jobs: JsonFileRepository<GenerationJob> = JsonFileRepository::open(&store_dir)?;
    let certificates: JsonFileRepository<CertificateRecord> = JsonFileRepository::open(&store_dir)?;

    let template_bytes = read_file(&args.template)?;
    let template_record = templates.create(TemplateRecord::new(
        file_stem(&args.template),
        file_name(&args.template),
        extract_from_docx(&template_bytes)?,
        template_bytes.len(),
    ))?;

    let dataset = load_dataset(&args.dataset)
        .with_context(|| format!("Failed to load dataset {}", args.dataset.display()))?;
    let dataset_record = datasets.create(DatasetRecord::from_dataset(file_name(&args.dataset), &dataset))?;
    tracing::info!(
        "Loaded {} rows with columns {:?}",
        dataset.row_count(),
        dataset.column_names()
    );

    let mapping: FieldMapping = match &args.mapping {
        Some(path) => serde_json::from_str(
            &std::fs::read_to_string(path).with_context(|| format!("Failed to read mapping {}", path.display()))?,
        )
        .with_context(|| format!("Invalid mapping file {}", path.display()))?,
        None => FieldMapping::new(),
    };

    let generator = BatchGenerator::new(Renderer::with_options(settings.render)?, mapping, options);
    let generator = match qr_encoder(args.qr_pattern.as_deref(), args.qr_image.as_deref())? {
        Some((pattern, encoder)) => generator.with_qr(pattern, encoder),
        None => generator,
    };

    let mut job = jobs.create(GenerationJob::new(template_record.id, dataset_record.id))?;
    job.start(dataset.row_count());
    jobs.update(job.clone())?;

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing rows in progress");
            on_interrupt.cancel();
        }
    });

    let result = generator
        .generate_parallel(Arc::from(template_bytes), &dataset, cancel, |progress| {
            tracing::debug!("Rendered {}/{} ({:.0}%)", progress.current, progress.total, progress.percent);
        })
        .await?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("Failed to create {}", args.out_dir.display()))?;
    for certificate in &result.certificates {
        write_file(&args.out_dir.join(&certificate.output_name), &certificate.data)?;
        certificates.create(CertificateRecord::new(
            job.id,
            certificate.row_index,
            certificate.output_name.clone(),
            certificate.data.len(),
        ))?;
    }
    for error in &result.errors {
        eprintln!("Row {}: {}", error.row_index + 1, error.message);
    }

    job.finish(&result);
    jobs.update(job)?;
    println!("{}", result.summary);

    if result.status == BatchStatus::Failed {
        bail!("No certificates were generated");
    }
    Ok(())
}

async fn load_settings(data_dir: &Path) -> Result<CertificateSettings> {
    let mut manager = SettingsManager::new(data_dir);
    let path = manager.settings_path().to_path_buf();
    let settings = manager
        .load()
        .await
        .with_context(|| format!("Failed to load {}", path.display()))?
        .clone();
    Ok(settings)
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn write_file(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).with_context(|| format!("Failed to write {}", path.display()))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Read an image file as a data URL the renderer accepts
fn image_payload(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let mime = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => bail!("Unsupported QR image type: {}", path.display()),
    };
    let bytes = read_file(path)?;
    Ok(format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    ))
}

/// QR source for a batch: a fixed image, or a code generated from the pattern
fn qr_encoder(pattern: Option<&str>, image: Option<&Path>) -> Result<Option<(QrPattern, Arc<dyn QrEncoder>)>> {
    let source: (QrPattern, Arc<dyn QrEncoder>) = match (pattern, image) {
        (_, Some(image)) => (
            QrPattern::new(pattern.unwrap_or_default()),
            Arc::new(FixedImage::new(image_payload(image)?)),
        ),
        (Some(pattern), None) => (QrPattern::new(pattern), Arc::new(QrCodeEncoder::new())),
        (None, None) => return Ok(None),
    };
    Ok(Some(source))
}

/// Flatten a JSON object into placeholder values
fn values_from_json(content: &str) -> Result<PlaceholderValues> {
    let json: serde_json::Value = serde_json::from_str(content).context("Values file is not valid JSON")?;
    let serde_json::Value::Object(map) = json else {
        bail!("Values file must contain a JSON object");
    };
    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, text)
        })
        .collect())
}
