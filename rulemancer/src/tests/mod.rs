// Parser tests
mod parsing;

mod serialization;

mod inference;
