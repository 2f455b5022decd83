//! Per-type component descriptors.
//!
//! A [`Schema`] is the closed capability surface of one component type: its
//! state fields, its action table keyed by `(name, arity)`, and its
//! read-accessors. It is built once when the type is registered and shared
//! by every instance of that type.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::codec::ID_FIELD;
use crate::coerce::{self, CoercionError, StateValue, TypeTag};

/// A server-side component whose state lives in the instance cache.
pub trait LiveComponent: Default + Send + 'static {
    /// Template path handed to the renderer.
    fn template(&self) -> &str;

    /// Declare state fields, actions and accessors. Called once per type,
    /// when the type is registered.
    fn schema(schema: &mut SchemaBuilder<Self>);

    /// Name used by [`ComponentRegistry::register_default`](crate::registry::ComponentRegistry::register_default).
    fn component_name() -> &'static str {
        short_type_name::<Self>()
    }
}

/// `my_app::widgets::Counter` -> `Counter`.
pub fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Property name implied by an accessor name: `getTotal` and `get_total`
/// become `total`, `isOpen` and `is_open` become `open`. Other names are
/// kept as they are.
pub fn property_name(accessor: &str) -> String {
    if let Some(rest) = accessor
        .strip_prefix("get_")
        .or_else(|| accessor.strip_prefix("is_"))
        && !rest.is_empty()
    {
        return rest.to_string();
    }

    for prefix in ["get", "is"] {
        if let Some(rest) = accessor.strip_prefix(prefix) {
            let mut chars = rest.chars();
            if let Some(first) = chars.next()
                && first.is_uppercase()
            {
                return first.to_lowercase().chain(chars).collect();
            }
        }
    }

    accessor.to_string()
}

type ReadFn<C> = Arc<dyn Fn(&C) -> Value + Send + Sync>;
type WriteFn<C> = Arc<dyn Fn(&mut C, Value) -> Result<(), CoercionError> + Send + Sync>;
type InvokeFn<C> = Arc<dyn Fn(&mut C, &[Value]) -> Result<(), ActionError> + Send + Sync>;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("parameter {index}: {source}")]
    Param {
        index: usize,
        #[source]
        source: CoercionError,
    },

    #[error("{0}")]
    Failed(String),
}

/// Return types accepted from action handlers.
pub trait ActionOutcome {
    fn into_outcome(self) -> Result<(), String>;
}

impl ActionOutcome for () {
    fn into_outcome(self) -> Result<(), String> {
        Ok(())
    }
}

impl<E: std::fmt::Display> ActionOutcome for Result<(), E> {
    fn into_outcome(self) -> Result<(), String> {
        self.map_err(|e| e.to_string())
    }
}

/// One declared state field.
pub struct StateField<C> {
    name: String,
    tag: TypeTag,
    read: ReadFn<C>,
    write: WriteFn<C>,
}

impl<C> StateField<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn read(&self, component: &C) -> Value {
        (self.read)(component)
    }

    /// Coerce `value` to the field's type and assign it.
    pub fn write(&self, component: &mut C, value: Value) -> Result<(), CoercionError> {
        (self.write)(component, value)
    }
}

/// One entry of the action table.
pub struct Action<C> {
    name: String,
    params: Vec<TypeTag>,
    invoke: InvokeFn<C>,
}

impl<C> Action<C> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Declared parameter types, in order.
    pub fn param_types(&self) -> &[TypeTag] {
        &self.params
    }

    /// Coerce `params` and run the handler.
    pub fn invoke(&self, component: &mut C, params: &[Value]) -> Result<(), ActionError> {
        (self.invoke)(component, params)
    }
}

/// A zero-argument read-accessor exposed to templates.
pub struct Accessor<C> {
    property: String,
    read: ReadFn<C>,
}

impl<C> Accessor<C> {
    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn read(&self, component: &C) -> Value {
        (self.read)(component)
    }
}

fn param<T: StateValue>(params: &[Value], index: usize) -> Result<T, ActionError> {
    let raw = params.get(index).cloned().unwrap_or(Value::Null);
    coerce::decode(raw).map_err(|source| ActionError::Param { index, source })
}

/// Collects declarations for one component type.
///
/// Declarations made directly on the builder take precedence over those
/// pulled in through [`SchemaBuilder::embed`], the same way an override in a
/// subtype hides its parent's member.
pub struct SchemaBuilder<C> {
    fields: Vec<StateField<C>>,
    actions: Vec<Action<C>>,
    accessors: Vec<Accessor<C>>,
    inherited_fields: Vec<StateField<C>>,
    inherited_actions: Vec<Action<C>>,
    inherited_accessors: Vec<Accessor<C>>,
}

impl<C: 'static> SchemaBuilder<C> {
    fn new() -> Self {
        Self {
            fields: Vec::new(),
            actions: Vec::new(),
            accessors: Vec::new(),
            inherited_fields: Vec::new(),
            inherited_actions: Vec::new(),
            inherited_accessors: Vec::new(),
        }
    }

    /// Declare a synchronized state field.
    pub fn state<T, G, M>(&mut self, name: &str, get: G, get_mut: M) -> &mut Self
    where
        T: StateValue,
        G: Fn(&C) -> &T + Send + Sync + 'static,
        M: Fn(&mut C) -> &mut T + Send + Sync + 'static,
    {
        if name == ID_FIELD {
            tracing::warn!(field = name, "Reserved state field name ignored");
            return self;
        }

        self.fields.push(StateField {
            name: name.to_string(),
            tag: T::TAG,
            read: Arc::new(move |c: &C| coerce::encode(get(c))),
            write: Arc::new(move |c: &mut C, value: Value| -> Result<(), CoercionError> {
                *get_mut(c) = coerce::decode::<T>(value)?;
                Ok(())
            }),
        });
        self
    }

    /// Declare an action taking no parameters.
    pub fn action<F, R>(&mut self, name: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut C) -> R + Send + Sync + 'static,
        R: ActionOutcome,
    {
        self.push_action(name, Vec::new(), move |c, _| {
            handler(c).into_outcome().map_err(ActionError::Failed)
        })
    }

    /// Declare an action taking one parameter.
    pub fn action1<A, F, R>(&mut self, name: &str, handler: F) -> &mut Self
    where
        A: StateValue,
        F: Fn(&mut C, A) -> R + Send + Sync + 'static,
        R: ActionOutcome,
    {
        self.push_action(name, vec![A::TAG], move |c, params| {
            let a = param::<A>(params, 0)?;
            handler(c, a).into_outcome().map_err(ActionError::Failed)
        })
    }

    /// Declare an action taking two parameters.
    pub fn action2<A, B, F, R>(&mut self, name: &str, handler: F) -> &mut Self
    where
        A: StateValue,
        B: StateValue,
        F: Fn(&mut C, A, B) -> R + Send + Sync + 'static,
        R: ActionOutcome,
    {
        self.push_action(name, vec![A::TAG, B::TAG], move |c, params| {
            let a = param::<A>(params, 0)?;
            let b = param::<B>(params, 1)?;
            handler(c, a, b).into_outcome().map_err(ActionError::Failed)
        })
    }

    /// Declare an action taking three parameters.
    pub fn action3<A, B, D, F, R>(&mut self, name: &str, handler: F) -> &mut Self
    where
        A: StateValue,
        B: StateValue,
        D: StateValue,
        F: Fn(&mut C, A, B, D) -> R + Send + Sync + 'static,
        R: ActionOutcome,
    {
        self.push_action(name, vec![A::TAG, B::TAG, D::TAG], move |c, params| {
            let a = param::<A>(params, 0)?;
            let b = param::<B>(params, 1)?;
            let d = param::<D>(params, 2)?;
            handler(c, a, b, d).into_outcome().map_err(ActionError::Failed)
        })
    }

    /// Declare a read-accessor. The render context key is the accessor's
    /// implied property name (see [`property_name`]).
    pub fn accessor<R, F>(&mut self, name: &str, read: F) -> &mut Self
    where
        R: Serialize,
        F: Fn(&C) -> R + Send + Sync + 'static,
    {
        self.accessors.push(Accessor {
            property: property_name(name),
            read: Arc::new(move |c: &C| coerce::encode(&read(c))),
        });
        self
    }

    /// Pull in the fields, actions and accessors of an embedded component,
    /// reached through the given lenses.
    pub fn embed<P, G, M>(&mut self, get: G, get_mut: M) -> &mut Self
    where
        P: LiveComponent,
        G: Fn(&C) -> &P + Send + Sync + 'static,
        M: Fn(&mut C) -> &mut P + Send + Sync + 'static,
    {
        let parent = Schema::<P>::build();
        let get = Arc::new(get);
        let get_mut = Arc::new(get_mut);

        for field in parent.fields {
            let (g, m) = (Arc::clone(&get), Arc::clone(&get_mut));
            let (read, write) = (field.read, field.write);
            self.inherited_fields.push(StateField {
                name: field.name,
                tag: field.tag,
                read: Arc::new(move |c: &C| read(g(c))),
                write: Arc::new(move |c: &mut C, value: Value| write(m(c), value)),
            });
        }

        for action in parent.actions.into_values().flat_map(BTreeMap::into_values) {
            let m = Arc::clone(&get_mut);
            let invoke = action.invoke;
            self.inherited_actions.push(Action {
                name: action.name,
                params: action.params,
                invoke: Arc::new(move |c: &mut C, params: &[Value]| invoke(m(c), params)),
            });
        }

        for accessor in parent.accessors {
            let g = Arc::clone(&get);
            let read = accessor.read;
            self.inherited_accessors.push(Accessor {
                property: accessor.property,
                read: Arc::new(move |c: &C| read(g(c))),
            });
        }

        self
    }

    fn push_action<F>(&mut self, name: &str, params: Vec<TypeTag>, invoke: F) -> &mut Self
    where
        F: Fn(&mut C, &[Value]) -> Result<(), ActionError> + Send + Sync + 'static,
    {
        self.actions.push(Action {
            name: name.to_string(),
            params,
            invoke: Arc::new(invoke),
        });
        self
    }

    fn finish(self, type_name: &'static str) -> Schema<C> {
        let mut fields: Vec<StateField<C>> = Vec::new();
        let mut field_index: HashMap<String, usize> = HashMap::new();
        for field in self.fields {
            match field_index.get(&field.name) {
                Some(&i) => fields[i] = field,
                None => {
                    field_index.insert(field.name.clone(), fields.len());
                    fields.push(field);
                }
            }
        }
        for field in self.inherited_fields {
            if !field_index.contains_key(&field.name) {
                field_index.insert(field.name.clone(), fields.len());
                fields.push(field);
            }
        }

        let mut actions: HashMap<String, BTreeMap<usize, Action<C>>> = HashMap::new();
        for action in self.actions {
            actions
                .entry(action.name.clone())
                .or_default()
                .insert(action.arity(), action);
        }
        for action in self.inherited_actions {
            actions
                .entry(action.name.clone())
                .or_default()
                .entry(action.arity())
                .or_insert(action);
        }

        let mut accessors: Vec<Accessor<C>> = Vec::new();
        for accessor in self.accessors {
            match accessors.iter().position(|a| a.property == accessor.property) {
                Some(i) => accessors[i] = accessor,
                None => accessors.push(accessor),
            }
        }
        for accessor in self.inherited_accessors {
            if !accessors.iter().any(|a| a.property == accessor.property) {
                accessors.push(accessor);
            }
        }

        Schema {
            type_name,
            fields,
            field_index,
            actions,
            accessors,
        }
    }
}

/// The closed capability surface of one component type.
pub struct Schema<C> {
    type_name: &'static str,
    fields: Vec<StateField<C>>,
    field_index: HashMap<String, usize>,
    actions: HashMap<String, BTreeMap<usize, Action<C>>>,
    accessors: Vec<Accessor<C>>,
}

impl<C: LiveComponent> Schema<C> {
    /// Run the type's declarations and freeze them.
    pub fn build() -> Self {
        let mut builder = SchemaBuilder::new();
        C::schema(&mut builder);
        let schema = builder.finish(short_type_name::<C>());
        tracing::debug!(
            component = schema.type_name,
            fields = schema.fields.len(),
            actions = schema.actions.values().map(BTreeMap::len).sum::<usize>(),
            accessors = schema.accessors.len(),
            "Component schema built"
        );
        schema
    }
}

impl<C> Schema<C> {
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// State fields in declaration order, own fields before embedded ones.
    pub fn fields(&self) -> &[StateField<C>] {
        &self.fields
    }

    /// The state field named `name`.
    pub fn field(&self, name: &str) -> Option<&StateField<C>> {
        self.field_index.get(name).map(|&i| &self.fields[i])
    }

    /// The action named `name` taking `arity` parameters.
    pub fn action(&self, name: &str, arity: usize) -> Option<&Action<C>> {
        self.actions.get(name)?.get(&arity)
    }

    /// Arities declared for `name`, ascending.
    pub fn arities(&self, name: &str) -> Vec<usize> {
        self.actions
            .get(name)
            .map(|by_arity| by_arity.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Sorted action names.
    pub fn action_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Computed properties, in declaration order.
    pub fn accessors(&self) -> &[Accessor<C>] {
        &self.accessors
    }
}
