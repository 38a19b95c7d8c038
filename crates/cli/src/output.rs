/// Token styling helpers.
///
/// The `t` module stands for "tokens". Use these helpers to style specific
/// values inside messages consistently across the CLI: info lines stay
/// neutral with highlighted tokens, success/warn lines are tinted whole.
pub mod t {
  use std::fmt::Display;

  use owo_colors::OwoColorize as _;

  pub fn id(value: impl Display) -> String {
    format!("{}", value.to_string().blue())
  }

  pub fn agent(value: impl Display) -> String {
    format!("{}", value.to_string().magenta())
  }

  pub fn resource(value: impl Display) -> String {
    format!("{}", value.to_string().cyan())
  }

  pub fn ok(s: impl Display) -> String {
    format!("{}", s.to_string().green())
  }

  pub fn warn(s: impl Display) -> String {
    format!("{}", s.to_string().yellow())
  }
}
