/// Application layer modules
///
/// Use cases compose the domain with the infrastructure:
/// - Repository selection through the filter language
/// - Running one command across the selection
/// - Registry maintenance and command resolution services
pub mod services;
pub mod use_cases;
