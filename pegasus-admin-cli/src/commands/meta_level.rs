use anyhow::Result;
use pegasus_admin::{
    AdminConfig, ClusterHandle, LevelTransition, MetaFunctionLevel, MetaLevelController,
};
use std::sync::Arc;

/// Print the current meta function level as JSON
pub async fn run_meta_level_get(
    handle: Arc<dyn ClusterHandle>,
    config: &AdminConfig,
) -> Result<()> {
    let level = MetaLevelController::from_config(handle, config)
        .get_level()
        .await?;
    println!("{}", render_level(level)?);
    Ok(())
}

/// Change the meta function level and confirm the transition
pub async fn run_meta_level_set(
    handle: Arc<dyn ClusterHandle>,
    config: &AdminConfig,
    level: &str,
) -> Result<()> {
    let transition = MetaLevelController::from_config(handle, config)
        .set_level(level)
        .await?;
    println!("{}", render_transition(&transition));
    Ok(())
}

fn render_level(level: MetaFunctionLevel) -> Result<String> {
    let body = serde_json::json!({ "meta_level": level.as_str() });
    Ok(serde_json::to_string_pretty(&body)?)
}

fn render_transition(transition: &LevelTransition) -> String {
    format!(
        "Successfully updated meta function level from \"{}\" to \"{}\"",
        transition.old_level, transition.new_level
    )
}
