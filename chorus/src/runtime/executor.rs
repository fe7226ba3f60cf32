use std::borrow::Cow;

use redis::aio::ConnectionLike;
use serde_json::Value;

use crate::{
    errors::{Error, ValidationError},
    runtime::{
        commands::MutationCommand,
        scripts::{ENTITY_CREATE_SCRIPT, ENTITY_DELETE_SCRIPT, ENTITY_PATCH_SCRIPT},
    },
};

/// Runs one command script and maps its error codes onto [`Error`].
pub async fn execute_command<C>(conn: &mut C, command: &MutationCommand) -> Result<Value, Error>
where
    C: ConnectionLike + Send,
{
    let script = match command {
        MutationCommand::CreateEntity(_) => &*ENTITY_CREATE_SCRIPT,
        MutationCommand::PatchEntity(_) => &*ENTITY_PATCH_SCRIPT,
        MutationCommand::DeleteEntity(_) => &*ENTITY_DELETE_SCRIPT,
    };

    let payload = serde_json::to_string(command).map_err(|err| Error::Other {
        message: Cow::Owned(format!("failed to serialize command: {err}")),
    })?;

    let mut invocation = script.prepare_invoke();
    invocation.arg(payload);
    let raw: String = invocation.invoke_async(conn).await?;

    let value: Value = serde_json::from_str(&raw).map_err(|err| Error::Other {
        message: Cow::Owned(format!("failed to parse lua response: {err}")),
    })?;

    match value.get("error").and_then(Value::as_str) {
        None if value.get("error").is_some() => Err(Error::other("lua_error")),
        None => Ok(value),
        Some(code) => Err(map_script_error(code, &value, command)),
    }
}

fn map_script_error(code: &str, value: &Value, command: &MutationCommand) -> Error {
    let text = |name: &str| match value.get(name) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };

    match code {
        "entity_not_found" => Error::not_found(command.entity(), command.entity_id()),
        "owner_mismatch" => {
            log::warn!(
                "{} {} changed owner between check and write (expected {}, found {})",
                command.entity(),
                command.entity_id(),
                text("expected"),
                text("actual")
            );
            Error::Forbidden {
                reason: Cow::Borrowed("not the owner"),
            }
        }
        "unique_constraint_violation" => {
            let field = text("field");
            let message = format!("an entry with {field} \"{}\" already exists", text("value"));
            Error::Validation(ValidationError::single(field, "unique", message))
        }
        "reference_not_found" => {
            let field = text("field");
            let message = format!("invalid pk \"{}\" - object does not exist", text("value"));
            Error::Validation(ValidationError::single(field, "not_found", message))
        }
        other => Error::Other {
            message: Cow::Owned(other.to_string()),
        },
    }
}

#[allow(async_fn_in_trait)]
pub trait MutationExecutor {
    async fn execute(&mut self, command: MutationCommand) -> Result<Value, Error>;
}

pub struct RedisExecutor<'a, C>
where
    C: ConnectionLike + Send,
{
    connection: &'a mut C,
}

impl<'a, C> RedisExecutor<'a, C>
where
    C: ConnectionLike + Send,
{
    pub fn new(connection: &'a mut C) -> Self {
        Self { connection }
    }
}

impl<C> MutationExecutor for RedisExecutor<'_, C>
where
    C: ConnectionLike + Send,
{
    async fn execute(&mut self, command: MutationCommand) -> Result<Value, Error> {
        execute_command(self.connection, &command).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::runtime::commands::EntityPatch;

    fn patch() -> MutationCommand {
        MutationCommand::PatchEntity(EntityPatch {
            entity: "comment",
            key: "k".into(),
            entity_id: "9".into(),
            owner_guard: None,
            assignments: Vec::new(),
            required: Vec::new(),
            reindex: Vec::new(),
        })
    }

    #[test]
    fn maps_missing_entity_to_not_found() {
        let err = map_script_error("entity_not_found", &json!({}), &patch());
        assert!(matches!(err, Error::NotFound { entity: "comment", ref id } if id == "9"));
    }

    #[test]
    fn maps_unique_violation_to_validation_issue() {
        let value = json!({"error": "unique_constraint_violation", "field": "slug", "value": "rust"});
        let err = map_script_error("unique_constraint_violation", &value, &patch());
        assert!(matches!(&err, Error::Validation(issues) if issues.has("slug", "unique")));
    }

    #[test]
    fn maps_owner_mismatch_to_forbidden() {
        let value = json!({"error": "owner_mismatch", "expected": "1", "actual": "2"});
        assert!(matches!(
            map_script_error("owner_mismatch", &value, &patch()),
            Error::Forbidden { .. }
        ));
    }
}
