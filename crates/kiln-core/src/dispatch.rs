use serde_json::Value;

use crate::error::ComponentError;
use crate::schema::{Action, ActionError, Schema, StateField};

/// Re-render with unchanged state (polling).
pub const REFRESH_ACTION: &str = "__refresh";

/// `updateField_<name>` assigns `params[0]` to state field `<name>`.
pub const UPDATE_FIELD_PREFIX: &str = "updateField_";

/// What an action name resolves to for a given schema.
pub enum Target<'a, C> {
    Refresh,
    UpdateField(&'a StateField<C>),
    Action(&'a Action<C>),
}

/// Resolve `action` with `arity` positional parameters against the schema's
/// action table. Reserved names are handled before the table is consulted.
pub fn resolve<'a, C>(
    schema: &'a Schema<C>,
    action: &str,
    arity: usize,
) -> Result<Target<'a, C>, ComponentError> {
    if action == REFRESH_ACTION {
        return Ok(Target::Refresh);
    }

    if let Some(field_name) = action.strip_prefix(UPDATE_FIELD_PREFIX) {
        return schema
            .field(field_name)
            .map(Target::UpdateField)
            .ok_or_else(|| ComponentError::FieldNotFound {
                component: schema.type_name().to_string(),
                field: field_name.to_string(),
            });
    }

    schema
        .action(action, arity)
        .map(Target::Action)
        .ok_or_else(|| ComponentError::ActionNotFound {
            component: schema.type_name().to_string(),
            action: action.to_string(),
            arity,
        })
}

/// Invoke `action` on `component`.
pub fn dispatch<C>(
    schema: &Schema<C>,
    component: &mut C,
    action: &str,
    params: &[Value],
) -> Result<(), ComponentError> {
    match resolve(schema, action, params.len())? {
        Target::Refresh => {
            tracing::debug!(component = schema.type_name(), "Refresh requested");
            Ok(())
        }
        Target::UpdateField(field) => {
            let value = params.first().cloned().unwrap_or(Value::Null);
            field
                .write(component, value)
                .map_err(|source| ComponentError::StateHydration {
                    field: field.name().to_string(),
                    source,
                })
        }
        Target::Action(handler) => {
            tracing::debug!(
                component = schema.type_name(),
                action,
                arity = params.len(),
                "Invoking action"
            );
            handler
                .invoke(component, params)
                .map_err(|e| match e {
                    ActionError::Param { index, source } => ComponentError::Coercion {
                        action: action.to_string(),
                        index,
                        source,
                    },
                    ActionError::Failed(reason) => ComponentError::ActionFailed {
                        action: action.to_string(),
                        reason,
                    },
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LiveComponent, SchemaBuilder};
    use serde_json::json;

    #[derive(Default)]
    struct Counter {
        count: i32,
        label: String,
        hijacked: bool,
    }

    impl LiveComponent for Counter {
        fn template(&self) -> &str {
            "counter.html"
        }

        fn schema(schema: &mut SchemaBuilder<Self>) {
            schema
                .state("count", |c| &c.count, |c| &mut c.count)
                .state("label", |c| &c.label, |c| &mut c.label)
                .action("increment", |c| c.count += 1)
                .action1("add", |c, n: i32| c.count += n)
                .action2("rename", |c, prefix: String, n: i32| {
                    c.label = format!("{prefix}-{n}");
                })
                .action("fail", |_| -> Result<(), String> { Err("nope".into()) })
                .action1("updateField_count", |c, _: i32| c.hijacked = true);
        }
    }

    #[test]
    fn dispatches_by_name_and_arity() {
        let schema = Schema::<Counter>::build();
        let mut counter = Counter::default();

        dispatch(&schema, &mut counter, "increment", &[]).unwrap();
        dispatch(&schema, &mut counter, "add", &[json!("4")]).unwrap();
        dispatch(&schema, &mut counter, "rename", &[json!(7), json!("3")]).unwrap();

        assert_eq!(counter.count, 5);
        assert_eq!(counter.label, "7-3");
    }

    #[test]
    fn unknown_action_is_action_not_found() {
        let schema = Schema::<Counter>::build();
        let mut counter = Counter::default();

        let err = dispatch(&schema, &mut counter, "explode", &[]).unwrap_err();
        assert!(matches!(err, ComponentError::ActionNotFound { ref action, arity: 0, .. } if action == "explode"));

        // right name, wrong arity
        let err = dispatch(&schema, &mut counter, "increment", &[json!(1)]).unwrap_err();
        assert!(matches!(err, ComponentError::ActionNotFound { arity: 1, .. }));
    }

    #[test]
    fn refresh_is_a_no_op() {
        let schema = Schema::<Counter>::build();
        let mut counter = Counter {
            count: 3,
            ..Default::default()
        };

        dispatch(&schema, &mut counter, REFRESH_ACTION, &[json!("ignored")]).unwrap();
        assert_eq!(counter.count, 3);
    }

    #[test]
    fn update_field_bypasses_action_table() {
        let schema = Schema::<Counter>::build();
        let mut counter = Counter::default();

        dispatch(&schema, &mut counter, "updateField_count", &[json!(5)]).unwrap();

        assert_eq!(counter.count, 5);
        assert!(!counter.hijacked);
    }

    #[test]
    fn update_field_requires_declared_field() {
        let schema = Schema::<Counter>::build();
        let mut counter = Counter::default();

        let err = dispatch(&schema, &mut counter, "updateField_hijacked", &[json!(true)]).unwrap_err();
        assert!(matches!(err, ComponentError::FieldNotFound { ref field, .. } if field == "hijacked"));
    }

    #[test]
    fn update_field_without_params_assigns_null() {
        let schema = Schema::<Counter>::build();
        let mut counter = Counter::default();

        // a plain i32 cannot hold null
        let err = dispatch(&schema, &mut counter, "updateField_count", &[]).unwrap_err();
        assert!(matches!(err, ComponentError::StateHydration { .. }));
    }

    #[test]
    fn bad_parameter_is_a_coercion_error() {
        let schema = Schema::<Counter>::build();
        let mut counter = Counter::default();

        let err = dispatch(&schema, &mut counter, "add", &[json!("many")]).unwrap_err();
        assert!(matches!(err, ComponentError::Coercion { index: 0, .. }));
        assert_eq!(counter.count, 0);
    }

    #[test]
    fn failing_action_reports_reason() {
        let schema = Schema::<Counter>::build();
        let mut counter = Counter::default();

        let err = dispatch(&schema, &mut counter, "fail", &[]).unwrap_err();
        assert_eq!(err.to_string(), "Action 'fail' failed: nope");
    }
}
