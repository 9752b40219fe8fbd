use axum::{ extract::FromRequest, response::{ IntoResponse, Response } };
use serde::Serialize;

use crate::error::AppError;

/// JSON body extractor whose rejections render as `AppError` validation failures.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        let Self(value) = self;
        axum::Json(value).into_response()
    }
}
