//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::handlers::health_handler::HealthResponse;
use crate::handlers::membership_handler::MembershipResponse;
use common::{ErrorBody, ErrorResponse, Stage};
use domain::{GroupMembership, GroupMembershipInformation, UserGroupMemberships};

/// API documentation struct.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health_handler::health_check,
        crate::handlers::membership_handler::get_group_membership,
        crate::handlers::membership_handler::list_user_memberships,
    ),
    components(
        schemas(
            GroupMembership,
            GroupMembershipInformation,
            UserGroupMemberships,
            MembershipResponse,
            HealthResponse,
            ErrorResponse,
            ErrorBody,
            Stage,
        )
    ),
    tags(
        (name = "GroupMembership", description = "Directory group membership lookups"),
        (name = "Health", description = "Service health"),
    )
)]
pub struct ApiDoc;
