// Domain layer: records, field mapping, the query model and the ports the
// adapters implement.

pub mod fields;
pub mod model;
pub mod ports;
pub mod query;
