//! The capability every priced item exposes to the resolution engine.

use super::types::{ProductId, SellerId};

/// A priced item that can receive a discount.
///
/// Cart lines, listing thumbnails and order snapshot lines all implement this
/// trait directly instead of sharing a base type. The engine reads the ids and
/// the current price, and only ever writes the price and the applied share
/// ratio.
///
/// Blanket implementations for `&mut T` and `Box<T>` allow heterogeneous
/// batches such as `Vec<&mut dyn PriceableItem>`.
pub trait PriceableItem: Send {
    fn product_id(&self) -> ProductId;

    fn seller_id(&self) -> SellerId;

    /// Current price in the smallest currency unit.
    fn price(&self) -> u64;

    fn set_price(&mut self, price: u64);

    /// Records the seller-borne share of the applied discount.
    fn set_applied_share_ratio(&mut self, ratio: f64);
}

impl<T: PriceableItem + ?Sized> PriceableItem for &mut T {
    fn product_id(&self) -> ProductId {
        (**self).product_id()
    }

    fn seller_id(&self) -> SellerId {
        (**self).seller_id()
    }

    fn price(&self) -> u64 {
        (**self).price()
    }

    fn set_price(&mut self, price: u64) {
        (**self).set_price(price)
    }

    fn set_applied_share_ratio(&mut self, ratio: f64) {
        (**self).set_applied_share_ratio(ratio)
    }
}

impl<T: PriceableItem + ?Sized> PriceableItem for Box<T> {
    fn product_id(&self) -> ProductId {
        (**self).product_id()
    }

    fn seller_id(&self) -> SellerId {
        (**self).seller_id()
    }

    fn price(&self) -> u64 {
        (**self).price()
    }

    fn set_price(&mut self, price: u64) {
        (**self).set_price(price)
    }

    fn set_applied_share_ratio(&mut self, ratio: f64) {
        (**self).set_applied_share_ratio(ratio)
    }
}
