use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tokio::time::{Duration, sleep};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use stagehand_core::persist::{JsonFileSink, SnapshotHandle, SnapshotLoop};
use stagehand_core::ports::{ContentHashIdentity, IdentityProvider};
use stagehand_core::{
    FileHandle, FileStatus, InMemoryTracker, ProgressQuery, RecordStore, Stage, StageFailure,
    StatusCounts, TaskId, TaskRecord, TrackerBuilder, TrackerConfig,
};

/// Runs simulated files through the document pipeline and reports progress.
#[derive(Debug, Parser)]
#[command(name = "stagehand", version, about)]
struct Args {
    /// Number of simulated files
    #[arg(long, default_value_t = 5)]
    files: usize,

    /// Every odd-numbered file fails at this stage
    #[arg(long, value_enum)]
    fail_stage: Option<PipelineStage>,

    /// Progress poll interval in milliseconds
    #[arg(long, default_value_t = 250)]
    poll_ms: u64,

    /// TOML config file
    #[arg(long, env = "STAGEHAND_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum PipelineStage {
    Cleanup,
    Extract,
    Classify,
    Tagging,
    RecommendName,
    Formatting,
    Moving,
}

impl PipelineStage {
    const ORDER: [PipelineStage; 7] = [
        PipelineStage::Cleanup,
        PipelineStage::Extract,
        PipelineStage::Classify,
        PipelineStage::Tagging,
        PipelineStage::RecommendName,
        PipelineStage::Formatting,
        PipelineStage::Moving,
    ];

    fn stage(self) -> Stage {
        match self {
            PipelineStage::Cleanup => Stage::Cleanup,
            PipelineStage::Extract => Stage::Extract,
            PipelineStage::Classify => Stage::Classify,
            PipelineStage::Tagging => Stage::Tagging,
            PipelineStage::RecommendName => Stage::RecommendName,
            PipelineStage::Formatting => Stage::Formatting,
            PipelineStage::Moving => Stage::Moving,
        }
    }
}

/// One unit of pipeline work. Writes its outputs straight to the tracker.
#[async_trait]
trait PipelineStep: Send + Sync {
    fn stage(&self) -> PipelineStage;

    async fn run(&self, tracker: &InMemoryTracker, file: &SimulatedFile) -> Result<(), String>;
}

struct SimulatedFile {
    id: TaskId,
    index: usize,
    name: String,
}

/// Sleeps a little, then produces plausible stage output.
struct SimulatedStep {
    stage: PipelineStage,
    fail_at: Option<PipelineStage>,
}

#[async_trait]
impl PipelineStep for SimulatedStep {
    fn stage(&self) -> PipelineStage {
        self.stage
    }

    async fn run(&self, tracker: &InMemoryTracker, file: &SimulatedFile) -> Result<(), String> {
        let latency = 20 + rand::random::<u64>() % 120;
        sleep(Duration::from_millis(latency)).await;

        if self.fail_at == Some(self.stage) && file.index % 2 == 1 {
            return Err(format!("simulated failure in {:?}", self.stage));
        }

        match self.stage {
            PipelineStage::Classify => tracker.set_classification(&file.id, "invoice"),
            PipelineStage::Tagging => {
                tracker.add_tag(&file.id, "finance");
                tracker.add_tag(&file.id, &format!("batch-{}", file.index % 3));
            }
            PipelineStage::RecommendName => {
                tracker.set_new_name(&file.id, &format!("Invoice {}", file.index))
            }
            PipelineStage::Formatting => tracker.set_formatted(&file.id, true),
            PipelineStage::Moving => tracker.set_new_path(&file.id, "Finance/Invoices"),
            PipelineStage::Cleanup | PipelineStage::Extract => {}
        }
        Ok(())
    }
}

/// Drives one file through every step. Stops at the first failure.
async fn process_file(
    tracker: Arc<InMemoryTracker>,
    steps: Arc<Vec<Box<dyn PipelineStep>>>,
    file: SimulatedFile,
) {
    // every fourth file is left alone
    if file.index % 4 == 3 {
        tracker.set_status(&file.id, FileStatus::Bypassed);
        return;
    }

    tracker.set_status(&file.id, FileStatus::Processing);

    for step in steps.iter() {
        let stage = step.stage().stage();

        // already formatted documents skip formatting
        if stage == Stage::Formatting && file.index % 5 == 0 {
            tracker.log_stage_skipped(&file.id, stage);
            continue;
        }

        tracker.log_stage_start(&file.id, stage);
        match step.run(&tracker, &file).await {
            Ok(()) => {
                let done = tracker.pairings().done_for(stage).unwrap_or(stage);
                tracker.log_stage_done(&file.id, done);
            }
            Err(message) => {
                let bucket = stage.error_bucket().unwrap_or(stage);
                warn!(task_id = %file.id, ?stage, %message, "stage failed");
                tracker.log_error(&file.id, StageFailure::new(bucket, message));
                tracker.set_status(&file.id, FileStatus::Error);
                return;
            }
        }
    }

    tracker.log_stage_done(&file.id, Stage::Completed);
    tracker.set_status(&file.id, FileStatus::Completed);
}

#[derive(Serialize)]
struct Summary {
    counts: StatusCounts,
    records: Vec<TaskRecord>,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stagehand=info,stagehand_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<TrackerConfig> {
    match path {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(TrackerConfig::default()),
    }
}

/// Register `count` simulated inbox files.
///
/// Simulated files have no body, so the inbox path stands in for content.
/// A file seen in an earlier run (restored snapshot) keeps its record.
fn register_files(
    tracker: &InMemoryTracker,
    identity: &dyn IdentityProvider,
    count: usize,
) -> Vec<SimulatedFile> {
    (0..count)
        .map(|index| {
            let name = format!("scan-{index:03}.pdf");
            let path = format!("Inbox/{name}");
            let id = tracker.start_tracking_with_name(identity.identify(path.as_bytes()), &name);
            tracker.attach_file(&id, FileHandle::new(path));
            SimulatedFile { id, index, name }
        })
        .collect()
}

/// この実行で登録したファイルが全て終端状態になるまで進捗を表示する
///
/// Restored records from an earlier run are counted but not waited on.
async fn poll_until_done(tracker: &InMemoryTracker, ids: &[TaskId], interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;

        let counts = tracker.status_counts();
        let line: Vec<String> = FileStatus::ALL
            .iter()
            .map(|status| format!("{status}={}", counts.get(*status)))
            .collect();
        println!("{}", line.join(" "));
        for record in tracker.get_all_records() {
            if record.status.is_terminal() {
                continue;
            }
            if let Some(stage) = tracker.get_last_stage(&record.id) {
                println!("  {} {}", record.original_name.as_deref().unwrap_or("?"), stage);
            }
        }

        let mut this_run = StatusCounts::default();
        for record in ids.iter().filter_map(|id| tracker.get_record(id)) {
            this_run.record(record.status);
        }
        if this_run.all_terminal() {
            break;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    // (A) config と tracker
    let config = load_config(args.config.as_ref())?;
    let tracker = Arc::new(
        TrackerBuilder::new()
            .config(&config)
            .build()
            .context("failed to build tracker")?,
    );

    // (B) snapshot persistence（設定がある場合のみ）
    let snapshots: Option<SnapshotHandle> = match &config.persistence {
        Some(persistence) => {
            let snapshot_loop = SnapshotLoop::new(
                tracker.clone(),
                Arc::new(JsonFileSink::new(&persistence.path)),
                persistence.debounce(),
            );
            snapshot_loop.restore().await;
            info!(path = %persistence.path.display(), "snapshot persistence enabled");
            Some(snapshot_loop.spawn())
        }
        None => None,
    };

    // (C) ファイル登録
    let files = register_files(&tracker, &ContentHashIdentity, args.files);
    info!(files = files.len(), "files queued");

    // (D) 1 ファイル 1 タスクで pipeline を起動
    let steps: Arc<Vec<Box<dyn PipelineStep>>> = Arc::new(
        PipelineStage::ORDER
            .into_iter()
            .map(|stage| {
                Box::new(SimulatedStep {
                    stage,
                    fail_at: args.fail_stage,
                }) as Box<dyn PipelineStep>
            })
            .collect(),
    );
    let ids: Vec<TaskId> = files.iter().map(|file| file.id.clone()).collect();
    let mut workers = Vec::with_capacity(files.len());
    for file in files {
        info!(task_id = %file.id, name = %file.name, "starting pipeline");
        workers.push(tokio::spawn(process_file(
            tracker.clone(),
            steps.clone(),
            file,
        )));
    }

    // (E) 完了までポーリング（Ctrl-C で中断）
    tokio::select! {
        _ = poll_until_done(&tracker, &ids, Duration::from_millis(args.poll_ms.max(1))) => {}
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted, stopping pipelines");
            for worker in &workers {
                worker.abort();
            }
        }
    }

    // (F) 最終 snapshot と summary
    if let Some(handle) = snapshots {
        handle.shutdown().await;
    }

    let summary = Summary {
        counts: tracker.status_counts(),
        records: tracker.snapshot(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&summary).context("failed to render summary")?
    );
    Ok(())
}
