use chrono::NaiveTime;
use rand::Rng;

use crate::db::models::Order;

/// Helper function to generate a pickup code
///
/// The code is a uniformly random number in `100000..=999999` rendered as a
/// six character decimal string. Codes are not checked for uniqueness
/// against other live orders.
///
/// # Arguments
///
/// * `rng` - The random number generator to draw from
///
/// # Returns
///
/// A `String` holding exactly six ASCII digits
pub fn generate_pickup_code(rng: &mut impl Rng) -> String {
    rng.gen_range(100_000..=999_999u32).to_string()
}

/// Returns `true` if `code` has the shape of a pickup code: six ASCII digits.
pub fn is_pickup_code(code: &str) -> bool {
    code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit())
}

/// Helper function to format an order time as "HH:MM"
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// One-line description of an order, used in log output.
pub fn order_summary(order: &Order) -> String {
    format!(
        "{} [{}] {} - {} at {}",
        order.id,
        order.status,
        order.client.name,
        order.client.address,
        format_time(order.time)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn pickup_codes_are_six_digits() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let code = generate_pickup_code(&mut rng);
            assert!(is_pickup_code(&code), "bad code {}", code);
            let value: u32 = code.parse().unwrap();
            assert!((100_000..=999_999).contains(&value));
        }
    }

    #[test]
    fn pickup_code_shape() {
        assert!(is_pickup_code("824193"));
        assert!(!is_pickup_code("82419"));
        assert!(!is_pickup_code("8241934"));
        assert!(!is_pickup_code("82a193"));
        assert!(!is_pickup_code("８２４１９３"));
    }

    #[test]
    fn formats_time_without_seconds() {
        let time = NaiveTime::from_hms_opt(9, 5, 42).unwrap();
        assert_eq!(format_time(time), "09:05");
    }
}
