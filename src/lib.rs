pub mod core;
pub mod rag;
pub mod session;
pub mod state;
pub mod vector_math;
