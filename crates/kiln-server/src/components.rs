//! Demo components served by the `kiln` binary.

use kiln_core::{ComponentRegistry, LiveComponent, SchemaBuilder};

pub struct Counter {
    count: i64,
    step: i64,
}

impl Default for Counter {
    fn default() -> Self {
        Self { count: 0, step: 1 }
    }
}

impl LiveComponent for Counter {
    fn template(&self) -> &str {
        "counter.html"
    }

    fn schema(schema: &mut SchemaBuilder<Self>) {
        schema
            .state("count", |c| &c.count, |c| &mut c.count)
            .state("step", |c| &c.step, |c| &mut c.step)
            .action("increment", |c| c.count = c.count.saturating_add(c.step))
            .action("decrement", |c| c.count = c.count.saturating_sub(c.step))
            .action1("add", |c, n: i64| c.count = c.count.saturating_add(n))
            .action("reset", |c| c.count = 0)
            .accessor("doubled", |c| c.count.saturating_mul(2))
            .accessor("isPositive", |c| c.count > 0);
    }
}

pub struct Toggle {
    on: bool,
    label: String,
}

impl Default for Toggle {
    fn default() -> Self {
        Self {
            on: false,
            label: "Feature".to_string(),
        }
    }
}

impl LiveComponent for Toggle {
    fn template(&self) -> &str {
        "toggle.html"
    }

    fn schema(schema: &mut SchemaBuilder<Self>) {
        schema
            .state("on", |c| &c.on, |c| &mut c.on)
            .state("label", |c| &c.label, |c| &mut c.label)
            .action("toggle", |c| c.on = !c.on)
            .accessor("getStatus", |c| if c.on { "ON" } else { "OFF" });
    }
}

/// Registry holding every demo component under its type name.
pub fn demo_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry
        .register_default::<Counter>()
        .register_default::<Toggle>();
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_registry_lists_both_components() {
        assert_eq!(demo_registry().names(), ["Counter", "Toggle"]);
    }
}
