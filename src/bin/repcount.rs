use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
/// 离线计数 - 回放关键点录制并输出每帧计数
///
/// 运行: cargo run --bin repcount -- --input frames.jsonl --exercise curl
use repcount_rs::counting::Exercise;
use repcount_rs::detection::IdentitySource;
use repcount_rs::pipeline::{
    elapsed_label, FramePipeline, RecordedFrame, ReplayCollaborator, ReplaySource,
};
use repcount_rs::{gen_time_string, CounterConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 运动计数程序
#[derive(Parser, Debug)]
#[command(author, version, about = "姿态关键点运动计数", long_about = None)]
struct Args {
    /// 关键点录制文件 (JSON Lines)
    #[arg(short, long)]
    input: PathBuf,

    /// 练习类型 (覆盖配置文件)
    #[arg(short, long, value_enum)]
    exercise: Option<Exercise>,

    /// 配置文件, 不存在时创建默认配置
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 每帧结果输出文件 (JSON Lines), 默认输出到标准输出
    #[arg(short, long, conflicts_with = "save")]
    output: Option<PathBuf>,

    /// 自动生成带时间戳的输出文件名
    #[arg(long)]
    save: bool,

    /// 最大缺席帧数, 超过后淘汰该主体
    #[arg(long)]
    max_missed_frames: Option<u32>,

    /// 帧率 (计时显示)
    #[arg(long)]
    fps: Option<f64>,

    /// 关键点置信度下限
    #[arg(long)]
    min_confidence: Option<f32>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "repcount_rs=info,repcount=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => CounterConfig::load_or_create(path)
            .with_context(|| format!("加载配置失败: {}", path.display()))?,
        None => CounterConfig::default(),
    };
    // 命令行参数覆盖配置文件
    if let Some(exercise) = args.exercise {
        config.exercise = Some(exercise);
        config.policy = None;
    }
    if args.max_missed_frames.is_some() {
        config.registry.max_missed_frames = args.max_missed_frames;
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(min_conf) = args.min_confidence {
        config.min_keypoint_confidence = min_conf;
    }
    config.print_summary();

    let policy = config.resolve_policy().context("练习策略无效")?;
    let mut pipeline = FramePipeline::new(policy, config.pipeline_config())?;

    let output_path = match (&args.output, args.save) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from(format!(
            "repcount_{}.jsonl",
            gen_time_string("_")
        ))),
        (None, false) => None,
    };
    let mut writer: Box<dyn Write> = match &output_path {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("无法创建输出文件 {}", path.display()))?;
            tracing::info!("💾 结果输出到 {}", path.display());
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(std::io::stdout().lock())),
    };

    let source = ReplaySource::open(&args.input)?;
    tracing::info!("📦 输入: {}", args.input.display());

    let mut pose = ReplayCollaborator;
    let mut tracker = ReplayCollaborator;
    for frame in source {
        let frame = frame?;
        // 录制中有追踪结果时为多人模式
        let identity: Option<&mut dyn IdentitySource<RecordedFrame>> = if frame.is_multi() {
            Some(&mut tracker)
        } else {
            None
        };
        let result = pipeline.run_frame(&frame, &mut pose, identity);
        serde_json::to_writer(&mut writer, &result)?;
        writeln!(writer)?;
    }
    writer.flush()?;

    if pipeline.frames_without_region() > 0 {
        tracing::warn!(
            "⚠️  {} 帧没有追踪结果, 练习 {} 需要多人录制 (detections)",
            pipeline.frames_without_region(),
            pipeline.policy().name
        );
    }

    let registry = pipeline.registry();
    let mut keys: Vec<_> = registry.keys().collect();
    keys.sort();
    tracing::info!(
        "✅ 处理完成: {} 帧 | 用时 {}",
        pipeline.frame_index(),
        elapsed_label(pipeline.frame_index(), config.fps)
    );
    for key in keys {
        if let Some(snapshot) = registry.snapshot(key) {
            let limbs: Vec<String> = snapshot
                .limbs
                .iter()
                .map(|l| format!("{}={}", l.limb, l.count))
                .collect();
            tracing::info!("  主体 {}: 共 {} 次 ({})", key, snapshot.total_count(), limbs.join(", "));
        }
    }
    tracing::info!("📊 {}", registry.stats());

    Ok(())
}
