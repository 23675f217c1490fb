//! Scene input: the generic element tree and its typed form.

pub mod element;
pub mod node;
