use std::sync::Arc;

use crate::application::polls::PollDeletionService;
use crate::application::revalidation::RevalidationService;

#[derive(Clone)]
pub struct ApiState {
    pub revalidation: Arc<RevalidationService>,
    pub polls: Arc<PollDeletionService>,
}
