use anyhow::{Context, Result};
use clap::Parser;
use record_advisor::report::SAMPLE_REPORT;
use record_advisor::*;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

/// Analyse a student record PDF against a target major and stream the report.
#[derive(Debug, Parser)]
#[command(name = "record_advisor", version)]
struct Args {
    /// Target major or career, e.g. 컴퓨터공학과
    #[arg(short, long)]
    goal: String,

    /// Student record PDF
    pdf: PathBuf,

    /// Replay a canned report instead of calling Vertex AI
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\n분석 오류: {:#}", e);
            eprintln!("The output above is incomplete and should not be relied on.");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let service = if args.mock {
        log::info!("Mock mode: replaying canned report");
        AnalysisService::new(
            Box::new(ScriptedBackend::streaming_text(SAMPLE_REPORT).with_delay(Duration::from_millis(20)))
                as Box<dyn GenerationBackend>,
            GenerationConfig::default(),
            Duration::from_secs(5),
        )
    } else {
        let config = AdvisorConfig::from_env().context("Vertex AI is not configured")?;
        log::info!("Credentials loaded from {}", config.credential_source);
        AnalysisService::new(
            Box::new(VertexService::new(&config)?) as Box<dyn GenerationBackend>,
            config.generation,
            config.timeout,
        )
    };

    let mut out = ChunkWriter::new(io::stdout());
    let text = service
        .analyze_file(&args.pdf, &args.goal, |chunk| out.write_chunk(chunk))
        .await?;
    out.write_chunk("\n");
    out.finish().context("could not write the report to stdout")?;

    let outline = ReportOutline::parse(&text);
    if !outline.is_complete() {
        log::warn!("Report does not follow the requested layout: {:?}", outline);
    }

    Ok(())
}

/// Forwards report fragments to a writer and remembers the first failure.
/// Once a write fails the rest of the report is dropped.
struct ChunkWriter<W> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> ChunkWriter<W> {
    fn new(writer: W) -> Self {
        Self { writer, error: None }
    }

    fn write_chunk(&mut self, chunk: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(e) = self
            .writer
            .write_all(chunk.as_bytes())
            .and_then(|_| self.writer.flush())
        {
            log::error!("Writing report output failed: {}", e);
            self.error = Some(e);
        }
    }

    fn finish(self) -> io::Result<()> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
