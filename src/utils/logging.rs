/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug 或 info 级别。
/// 重复调用时静默忽略（测试中可能多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `topic`: 课程主题
/// - `reduced_volume`: 是否为精简模式
/// - `backend`: 生成服务和存储后端的描述
pub fn log_startup(topic: &str, reduced_volume: bool, backend: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 课程题库生成");
    info!("📚 主题: {}", topic);
    info!(
        "📊 模式: {}",
        if reduced_volume { "精简（每个叶子主题 5 题）" } else { "完整（每个叶子主题 100 题）" }
    );
    info!("🔧 后端: {}", backend);
    info!("{}", "=".repeat(60));
}

/// 记录叶子主题处理开始
pub fn log_topic_start(index: usize, total: usize, name: &str) {
    info!("\n{}", "─".repeat(30));
    info!("处理第 {}/{} 个叶子主题: {}", index, total, name);
}

/// 打印最终统计信息
///
/// # 参数
/// - `total_topics`: 叶子主题总数
/// - `total_questions`: 写入的题目总数
/// - `failed`: 失败的主题名称
pub fn print_final_stats(total_topics: usize, total_questions: usize, failed: &[String]) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功主题: {}/{}", total_topics - failed.len(), total_topics);
    info!("📝 题目总数: {}", total_questions);
    if !failed.is_empty() {
        info!("❌ 失败主题: {}", preview_names(failed, 3));
    }
    info!("{}", "=".repeat(60));
}

/// 最多显示 `limit` 个名称，超出部分以 "..." 表示
pub fn preview_names(names: &[String], limit: usize) -> String {
    let shown = names.iter().take(limit).map(String::as_str).collect::<Vec<_>>().join(", ");
    if names.len() > limit {
        format!("{}...", shown)
    } else {
        shown
    }
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
