mod dto;
mod imports;
mod photos;
mod response;
mod router;
mod sources;

pub use dto::{ConfigResponse, PhotoItem, PhotoListResponse, UploadResponse};
pub use response::ApiError;
pub use router::{AppState, create_router};
