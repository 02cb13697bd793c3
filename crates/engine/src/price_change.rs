use catalog::Price;

/// A stored price change, ready to be pushed to the product trackers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceChange {
    pub product_id: i32,
    pub name: String,
    pub link: String,
    pub previous: Price,
    pub current: Price,
    /// Chat ids of the users tracking the product.
    pub subscribers: Vec<i64>,
}

impl PriceChange {
    /// Signed change, negative when the price went down.
    pub fn delta(&self) -> Price {
        self.current - self.previous
    }

    /// Returns `true` when the absolute change reaches `threshold`.
    pub fn is_notable(&self, threshold: Price) -> bool {
        !self.delta().is_zero() && self.delta().abs() >= threshold
    }

    /// Notification text sent to every tracker.
    pub fn message(&self) -> String {
        let delta = self.delta();
        let (emoji, direction) = if delta.is_negative() {
            ("😁", "снизилась")
        } else {
            ("😡", "выросла")
        };
        format!(
            "{emoji}{name}\n\n{link}\n\nЦена {direction} на {abs} BYN\nПредыдущая цена = {previous} BYN\nНовая цена = {current} BYN",
            name = self.name,
            link = self.link,
            abs = delta.abs(),
            previous = self.previous,
            current = self.current,
        )
    }
}
