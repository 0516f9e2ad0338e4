use std::collections::BTreeMap;
use std::sync::Arc;

use crate::{CryptoCalendar, ExchangeCalendar, ForexCalendar, TradingCalendar};

/// Caller-owned map from calendar id to calendar handle.
///
/// There is no process-global registry: whoever constructs session managers
/// owns one of these and passes it by reference.
#[derive(Debug, Clone, Default)]
pub struct CalendarRegistry {
    calendars: BTreeMap<String, Arc<dyn TradingCalendar>>,
}

impl CalendarRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `FOREX`, `CRYPTO` and `XNYS` calendars.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        reg.register(Arc::new(ForexCalendar::new()));
        reg.register(Arc::new(CryptoCalendar::new()));
        reg.register(Arc::new(ExchangeCalendar::xnys()));
        reg
    }

    /// Register `calendar` under its own id, returning any calendar it replaced.
    pub fn register(
        &mut self,
        calendar: Arc<dyn TradingCalendar>,
    ) -> Option<Arc<dyn TradingCalendar>> {
        self.calendars
            .insert(calendar.calendar_id().to_string(), calendar)
    }

    pub fn get(&self, calendar_id: &str) -> Option<Arc<dyn TradingCalendar>> {
        self.calendars.get(calendar_id).cloned()
    }

    pub fn contains(&self, calendar_id: &str) -> bool {
        self.calendars.contains_key(calendar_id)
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.calendars.keys().map(String::as_str)
    }
}
