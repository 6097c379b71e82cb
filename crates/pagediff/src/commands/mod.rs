mod compare;

pub use compare::compare;
