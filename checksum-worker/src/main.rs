use checksum_worker::{
    Action, CheckerError, ChecksumStorage, ChecksumWorker, FileBitstreamStore, MetadataRepository,
    RunSummary, SelectionCriteria, SelectionFlags, scope, setup_environment,
};
use clap::Parser;
use shared::error::{AppError, AppResult, ErrorCode};
use std::process::ExitCode;
use std::sync::Arc;

/// Verify stored bitstreams against their recorded checksums
#[derive(Parser, Debug)]
#[command(
    name = "checksum-worker",
    version,
    after_help = "Give dates in the american style: mm/dd/yyyy eg 2/20/2013 for Feb 20th 2013 (yyyy-mm-dd is accepted too)"
)]
struct Args {
    /// Work on bitstreams last checked after given date
    #[arg(short = 'a', long)]
    after: Option<String>,

    /// Work on bitstreams last checked before given date
    #[arg(short = 'b', long)]
    before: Option<String>,

    /// Work on at most the given number of bitstreams
    #[arg(short = 'c', long)]
    count: Option<usize>,

    /// Action to apply to bitstreams, one of check, print, history, delete
    #[arg(short = 'd', long = "do", default_value = "check")]
    action: String,

    /// Work on bitstreams whose last result is <RESULT>
    #[arg(short = 'i', long = "include-result", alias = "include_result")]
    include_result: Option<String>,

    /// Work on bitstreams whose last result is not one of BITSTREAM_NOT_FOUND,
    /// BITSTREAM_MARKED_DELETED, CHECKSUM_ALGORITHM_INVALID
    #[arg(short = 'l', long = "loop")]
    loop_: bool,

    /// Work on bitstreams in the given community, collection or item, or on
    /// the given bitstream; give root as handle or TYPE.ID
    #[arg(short = 'r', long)]
    root: Option<String>,

    /// Be verbose
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Work on bitstreams whose last result is not one of the given results
    /// (comma separated list)
    #[arg(short = 'x', long = "exclude-result", alias = "exclude_result")]
    exclude_result: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(summary) => {
            println!("{}", summary);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(
                code = %e.code,
                category = e.code.category().name(),
                error = %e.message,
                "Checksum run aborted"
            );
            eprintln!("[{}] {}", e.code, e.message);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

fn run(args: Args) -> AppResult<RunSummary> {
    // 1. 环境 (dotenv, 日志)
    let config = setup_environment()
        .map_err(|e| AppError::with_message(ErrorCode::ConfigError, e.to_string()))?;

    // 2. 参数校验 (不访问数据库)
    let action: Action = args.action.parse()?;
    let mut criteria = SelectionCriteria::from_flags(&SelectionFlags {
        include_result: args.include_result,
        exclude_results: args.exclude_result,
        use_default_excludes: args.loop_,
        before: args.before,
        after: args.after,
    })?;

    // 3. 打开元数据库
    let storage = ChecksumStorage::open(&config.database_path).map_err(|e| {
        AppError::with_message(
            ErrorCode::StorageUnavailable,
            format!(
                "could not open database {}: {}",
                config.database_path.display(),
                e
            ),
        )
    })?;
    let stats = storage.get_stats().map_err(CheckerError::from)?;
    tracing::info!(
        bitstreams = stats.bitstream_count,
        statuses = stats.status_count,
        history = stats.history_count,
        objects = stats.object_count,
        "Metadata store opened"
    );
    let repo: Arc<dyn MetadataRepository> = Arc::new(storage);

    // 4. 解析范围
    if let Some(token) = &args.root {
        criteria = criteria.with_root(scope::resolve_root(repo.as_ref(), token)?);
    }

    tracing::info!(
        database = %config.database_path.display(),
        assetstore = %config.assetstore_dir.display(),
        "Checksum worker starting"
    );

    // 5. 运行
    let store = Arc::new(FileBitstreamStore::new(
        config.assetstore_dir.clone(),
        Arc::clone(&repo),
    ));
    let worker = ChecksumWorker::new(repo, store, config.scan_page_size);
    let summary = worker.run(
        action,
        &criteria,
        args.count,
        args.verbose,
        std::io::stdout().lock(),
    )?;

    Ok(summary)
}
