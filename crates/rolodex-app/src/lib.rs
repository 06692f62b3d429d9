// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod form;
pub mod grid;
pub mod ids;
pub mod layout;
pub mod model;
pub mod provider;
pub mod query;
pub mod selection;
pub mod status;
pub mod view;

pub use form::*;
pub use grid::*;
pub use ids::*;
pub use layout::*;
pub use model::*;
pub use provider::*;
pub use query::*;
pub use selection::*;
pub use status::*;
pub use view::*;
