use crate::dto::HealthRes;

/// Simple health service used by the REST API.
///
/// This service provides a standardised way to report the health status of the SIMRS service.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    /// Health including the outcome of a database ping.
    ///
    /// # Returns
    /// A `HealthRes` that is `ok` only when the database answered.
    pub fn check_health_with_database(database_ok: bool) -> HealthRes {
        HealthRes {
            ok: database_ok,
            message: if database_ok {
                "SIMRS is alive".into()
            } else {
                "SIMRS is up but the database is unreachable".into()
            },
            database: Some(database_ok),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_database_is_not_ok() {
        let res = HealthService::check_health_with_database(false);
        assert!(!res.ok);
        assert_eq!(res.database, Some(false));
    }
}
