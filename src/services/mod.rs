// Service layer: composes the pure filter and aggregate functions into views.

pub mod dashboard;
