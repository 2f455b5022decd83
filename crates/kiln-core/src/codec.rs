use serde_json::{Map, Value};

use crate::error::ComponentError;
use crate::id::ComponentId;
use crate::schema::Schema;

/// Snapshot and render-context key carrying the component identity.
pub const ID_FIELD: &str = "_id";

/// Ordered field name -> value mapping exchanged with clients.
pub type Snapshot = Map<String, Value>;

/// Read every declared state field, identity first.
pub fn capture<C>(schema: &Schema<C>, id: &ComponentId, component: &C) -> Snapshot {
    let mut snapshot = Snapshot::new();
    snapshot.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    for field in schema.fields() {
        snapshot.insert(field.name().to_string(), field.read(component));
    }
    snapshot
}

/// Merge client-held state into `component`.
///
/// Only declared fields present in `snapshot` with a non-null value are
/// assigned; everything else keeps its current value. `_id` is never
/// assigned. If any field fails to coerce, the fields already assigned by
/// this call are put back and the component is left as it was.
pub fn hydrate<C>(
    schema: &Schema<C>,
    component: &mut C,
    snapshot: &Snapshot,
) -> Result<(), ComponentError> {
    apply(schema, component, snapshot, false)
}

/// Put a captured snapshot back, including null values.
pub fn restore<C>(
    schema: &Schema<C>,
    component: &mut C,
    snapshot: &Snapshot,
) -> Result<(), ComponentError> {
    apply(schema, component, snapshot, true)
}

fn apply<C>(
    schema: &Schema<C>,
    component: &mut C,
    snapshot: &Snapshot,
    keep_nulls: bool,
) -> Result<(), ComponentError> {
    let mut previous: Vec<(usize, Value)> = Vec::new();

    for (index, field) in schema.fields().iter().enumerate() {
        let Some(value) = snapshot.get(field.name()) else {
            continue;
        };
        if value.is_null() && !keep_nulls {
            continue;
        }

        let before = field.read(component);
        if let Err(source) = field.write(component, value.clone()) {
            for (i, old) in previous.into_iter().rev() {
                let field = &schema.fields()[i];
                if let Err(e) = field.write(component, old) {
                    tracing::error!(
                        component = schema.type_name(),
                        field = field.name(),
                        error = %e,
                        "Could not put back field after failed hydration"
                    );
                }
            }
            return Err(ComponentError::StateHydration {
                field: field.name().to_string(),
                source,
            });
        }
        previous.push((index, before));
    }

    Ok(())
}

/// Context handed to the renderer: identity, every state field, then every
/// accessor keyed by its property name.
pub fn render_context<C>(schema: &Schema<C>, id: &ComponentId, component: &C) -> Snapshot {
    let mut context = capture(schema, id, component);
    for accessor in schema.accessors() {
        context.insert(accessor.property().to_string(), accessor.read(component));
    }
    context
}
