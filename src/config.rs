use envconfig::Envconfig;

use crate::db::models::OrderStatus;

#[derive(Envconfig, Debug, Clone)]
pub struct Config {
    #[envconfig(from = "PHARMOPS_DATA_FILE", default = "data/orders.json")]
    pub data_file: String,

    /// Cron expression (with seconds) for the simulated driver claims.
    #[envconfig(from = "PHARMOPS_CLAIM_SCHEDULE", default = "*/5 * * * * *")]
    pub claim_schedule: String,

    #[envconfig(from = "PHARMOPS_SIMULATE_CLAIMS", default = "true")]
    pub simulate_claims: bool,

    #[envconfig(from = "PHARMOPS_RELEASE_DRIVERS", default = "false")]
    pub release_drivers: bool,

    #[envconfig(from = "PHARMOPS_FALLBACK_PHARMACY", default = "Nearest partner pharmacy")]
    pub fallback_pharmacy: String,

    #[envconfig(from = "PHARMOPS_RNG_SEED")]
    pub rng_seed: Option<u64>,

    /// Only show orders with this status on the logged board, e.g.
    /// `waiting for delivery`. Unset shows every order.
    #[envconfig(from = "PHARMOPS_BOARD_STATUS")]
    pub board_status: Option<OrderStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::init_from_hashmap(&HashMap::new()).unwrap();
        assert_eq!(config.data_file, "data/orders.json");
        assert_eq!(config.claim_schedule, "*/5 * * * * *");
        assert!(config.simulate_claims);
        assert!(!config.release_drivers);
        assert_eq!(config.fallback_pharmacy, "Nearest partner pharmacy");
        assert_eq!(config.rng_seed, None);
        assert_eq!(config.board_status, None);
    }

    #[test]
    fn reads_overrides() {
        let vars = HashMap::from([
            ("PHARMOPS_RELEASE_DRIVERS".to_string(), "true".to_string()),
            ("PHARMOPS_RNG_SEED".to_string(), "99".to_string()),
            ("PHARMOPS_FALLBACK_PHARMACY".to_string(), "Pharmacy Downtown".to_string()),
            ("PHARMOPS_BOARD_STATUS".to_string(), "Waiting for delivery".to_string()),
        ]);
        let config = Config::init_from_hashmap(&vars).unwrap();
        assert!(config.release_drivers);
        assert_eq!(config.rng_seed, Some(99));
        assert_eq!(config.fallback_pharmacy, "Pharmacy Downtown");
        assert_eq!(config.board_status, Some(OrderStatus::WaitingForDelivery));
    }

    #[test]
    fn rejects_malformed_values() {
        let vars = HashMap::from([("PHARMOPS_RNG_SEED".to_string(), "soon".to_string())]);
        assert!(Config::init_from_hashmap(&vars).is_err());

        let vars = HashMap::from([("PHARMOPS_BOARD_STATUS".to_string(), "shipped".to_string())]);
        assert!(Config::init_from_hashmap(&vars).is_err());
    }
}
