pub mod album_client;
pub mod customer_service;
pub mod enrichment;
pub mod lead_provisioning;

#[cfg(test)]
pub mod fakes;
