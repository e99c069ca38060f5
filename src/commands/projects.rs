//! Project commands.

use anyhow::{Context as _, Result};
use serde_json::{Map, Value};

use super::Context;
use crate::ui;

/// Reduce the user info document to a `{id: name}` map of projects.
pub fn project_names(userinfo: &Value) -> Value {
    let projects = userinfo["projects"].as_array().cloned().unwrap_or_default();
    let names: Map<String, Value> = projects
        .into_iter()
        .filter_map(|p| {
            let id = p["id"].as_str()?.to_string();
            Some((id, p["name"].clone()))
        })
        .collect();
    Value::Object(names)
}

/// List the projects the current user can access.
pub fn list(ctx: &Context<'_>) -> Result<()> {
    let url = format!("{}/oauth/userinfo/", ctx.api.base_url());
    let res = ctx.api.get_json(&url).context("Failed to get projects")?;
    ui::print_json(&project_names(&res))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_ids_to_names() {
        let info = json!({
            "username": "me",
            "projects": [
                { "id": "p1", "name": "First" },
                { "id": "p2", "name": "Second" },
                { "name": "no id" }
            ]
        });
        assert_eq!(
            project_names(&info),
            json!({ "p1": "First", "p2": "Second" })
        );
    }

    #[test]
    fn missing_projects_is_empty() {
        assert_eq!(project_names(&json!({})), json!({}));
    }
}
