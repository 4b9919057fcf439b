use crate::commands::{config, tour, watch};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "tour",
            groups: tour::EXAMPLES,
        },
        CommandExample {
            name: "watch",
            groups: watch::EXAMPLES,
        },
        CommandExample {
            name: "config",
            groups: config::EXAMPLES,
        },
    ]
}
