// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Customers ---
        handlers::customers::list_customers,
        handlers::customers::get_customer,
        handlers::customers::create_customer,
        handlers::customers::update_customer,
        handlers::customers::update_status,

        // --- Leads ---
        handlers::customers::add_leads,
        handlers::customers::list_leads,
    ),
    components(
        schemas(
            // --- Projeções ---
            models::crm::UserSummary,
            models::crm::ProductSummary,
            models::crm::Department,

            // --- CRM ---
            models::crm::ImageRef,
            models::crm::CustomerLead,
            models::crm::LeadPage,
            models::crm::Customer,
            models::crm::CustomerPage,

            // --- Payloads ---
            models::crm::LeadSubmission,
            models::crm::CreateCustomerPayload,
            models::crm::UpdateCustomerPayload,
            models::crm::UpdateStatusPayload,
        )
    ),
    tags(
        (name = "Customers", description = "Clientes, leads e álbuns de fotos")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_customer_route() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();

        for expected in [
            "/api/customers",
            "/api/customers/{id}",
            "/api/customers/{id}/status",
            "/api/customers/{id}/leads",
        ] {
            assert!(paths.iter().any(|p| p.as_str() == expected), "rota {} sem documentação", expected);
        }
    }
}
