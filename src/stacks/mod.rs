//! Stack definitions and assembly of an `App` from config.

pub mod users;

use crate::core::construct::App;
use crate::core::resolver::{self, EnvSource};
use crate::core::stack::StackProps;
use crate::core::types::AppConfig;
use crate::error::Result;
use users::UsersTableStack;

/// Build an app with one users-table stack per configured stack.
pub fn build_app(config: &AppConfig, env: &dyn EnvSource) -> Result<App> {
    let mut app = App::new();
    for (id, stack_config) in &config.stacks {
        let resolved = resolver::resolve_stack_templates(stack_config, &config.params, env)?;
        let props = StackProps {
            env: resolved.env,
            stack_name: resolved.stack_name,
            description: resolved.description,
            tags: resolved.tags,
            termination_protection: resolved.termination_protection,
            export_outputs: resolved.export_outputs,
        };
        let stack = UsersTableStack::new(&app, id, props);
        tracing::info!(
            stack = id.as_str(),
            table = stack.users_table.table_name().unwrap_or_default(),
            "declared users table stack"
        );
        app.add_stack(stack);
    }
    Ok(app)
}
