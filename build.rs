use esp_config::{ConfigOption, DisplayHint, Stability, Validator, Value, generate_config};

fn main() {
    // emit config
    generate_config(
        "esp-task-wdt",
        &[
            ConfigOption {
                name: "max_tasks".to_string(),
                description: "Maximum number of tasks the supervisor can track. Must be a \
                multiple of 32; the task-id pool never grows at runtime.".to_string(),
                default_value: Value::Integer(64),
                constraint: Some(Validator::PositiveInteger),
                stability: Stability::Unstable,
                active: true,
                display_hint: DisplayHint::None,
            },
            ConfigOption {
                name: "default_rescale_time".to_string(),
                description: "Default supervision period, as a multiple of the 10 ms base tick.".to_string(),
                default_value: Value::Integer(500),
                constraint: Some(Validator::PositiveInteger),
                stability: Stability::Unstable,
                active: true,
                display_hint: DisplayHint::None,
            },
            ConfigOption {
                name: "min_rescale_time".to_string(),
                description: "Smallest accepted supervision period multiplier.".to_string(),
                default_value: Value::Integer(10),
                constraint: Some(Validator::PositiveInteger),
                stability: Stability::Unstable,
                active: true,
                display_hint: DisplayHint::None,
            },
            ConfigOption {
                name: "max_rescale_time".to_string(),
                description: "Largest accepted supervision period multiplier.".to_string(),
                default_value: Value::Integer(3000),
                constraint: Some(Validator::PositiveInteger),
                stability: Stability::Unstable,
                active: true,
                display_hint: DisplayHint::None,
            },
        ],
        true,
        true,
    );
}
