//! Routing of a transport result to the success or failure branch.
//!
//! Connectivity selects the branch; the classified HTTP status rides along.
//! A connected round trip answering 500 is a success with
//! `InternalServerError`, and a disconnected one answering 200 is a failure
//! with `Ok`. A missing response object is always a failure with
//! `Unrecognized` and no data.

use crate::http::{HttpResponse, ResponseData};
use crate::status::{classify, StatusKind};

/// Routing decision for one completed request. The handler and the broadcast
/// channels both consume the same value, so they never disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded {
        status: StatusKind,
        data: ResponseData,
    },
    Failed {
        status: StatusKind,
        data: Option<ResponseData>,
    },
}

impl Outcome {
    pub fn route(connected: bool, response: Option<HttpResponse>) -> Self {
        let Some(response) = response else {
            return Outcome::Failed {
                status: classify(connected, None),
                data: None,
            };
        };

        let status = classify(connected, Some(response.status));
        let data = ResponseData::from(response);
        if connected {
            Outcome::Succeeded { status, data }
        } else {
            Outcome::Failed {
                status,
                data: Some(data),
            }
        }
    }

    pub fn status(&self) -> StatusKind {
        match self {
            Outcome::Succeeded { status, .. } | Outcome::Failed { status, .. } => *status,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Succeeded { .. })
    }

    pub fn data(&self) -> Option<&ResponseData> {
        match self {
            Outcome::Succeeded { data, .. } => Some(data),
            Outcome::Failed { data, .. } => data.as_ref(),
        }
    }
}
