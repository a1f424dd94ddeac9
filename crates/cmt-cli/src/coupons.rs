use cmt_core::AppConfig;

use crate::services;

/// Print the allow-list as the matcher sees it: trimmed, upper-cased and
/// deduplicated.
pub(crate) async fn run_coupons(config: &AppConfig) -> anyhow::Result<()> {
    let matcher = services::load_matcher(config).await?;

    println!("{} tracked coupon(s)", matcher.len());
    for code in matcher.tracked_coupons() {
        println!("  {code}");
    }
    Ok(())
}
