use server_api::ApiContext;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    /// `None` accepts request bodies of any size on the upload route.
    pub(crate) max_upload_bytes: Option<usize>,
}
