// Database module
// Vector storage for embedded chunks, backed by LanceDB

pub mod lancedb;

pub use self::lancedb::{
    ConsistencyLevel, IndexedRecord, NewRecord, OutputField, SearchHit, VectorStore,
    vector_store::LanceVectorStore,
};
