pub mod schema;
pub mod schemas;

pub use schema::FieldRule;
pub use schema::ObjectSchema;
pub use schema::RequestParts;
pub use schema::RequestSchema;
pub use schema::Segment;
pub use schema::ValidationFailure;
pub use schema::ValidationIssue;
