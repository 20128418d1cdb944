use axum::extract::FromRequest;

use crate::error::AppError;

/// `Json` whose rejections answer with the usual 400 error envelope
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
