use serde::{Deserialize, Serialize};

/// Search parameters for the sold-listings index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Search URL including the location filter, without area or page parameters
    pub base_url: String,
    /// Prefix for the relative listing links found in result pages
    pub origin: String,
    /// Smallest living area to search (m²)
    pub min_area: u32,
    /// Largest living area to search (m²)
    pub max_area: u32,
    /// Bin width offset below `wide_threshold`
    pub step: u32,
    /// Lower bound from which bins use `wide_step`
    pub wide_threshold: u32,
    /// Bin width offset from `wide_threshold` upwards
    pub wide_step: u32,
    /// Results per search page
    pub page_size: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            base_url: "https://www.hemnet.se/salda/bostader?location_ids%5B%5D=17989".to_string(),
            origin: "https://www.hemnet.se".to_string(),
            min_area: 20,
            max_area: 250,
            step: 2,
            wide_threshold: 160,
            wide_step: 10,
            page_size: 50,
        }
    }
}

/// Inclusive living-area slice queried on its own to stay under the
/// site's result cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaBin {
    pub min: u32,
    pub max: u32,
}

impl AreaBin {
    #[cfg(test)]
    pub fn contains(&self, area: u32) -> bool {
        (self.min..=self.max).contains(&area)
    }

    pub fn width(&self) -> u32 {
        self.max - self.min + 1
    }
}

impl std::fmt::Display for AreaBin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{} m²", self.min, self.max)
    }
}

impl SearchParams {
    /// Contiguous, non-overlapping bins from `min_area` until `max_area` is
    /// covered. The last bin may reach past `max_area`.
    pub fn area_bins(&self) -> Vec<AreaBin> {
        let mut bins = Vec::new();
        let mut current = self.min_area;

        while current <= self.max_area {
            let offset = if current < self.wide_threshold {
                self.step
            } else {
                self.wide_step
            };
            let bin = AreaBin {
                min: current,
                max: current.saturating_add(offset),
            };
            bins.push(bin);

            if bin.max == u32::MAX {
                break;
            }
            current = bin.max + 1;
        }

        bins
    }

    pub fn bin_url(&self, bin: AreaBin) -> String {
        format!(
            "{}&living_area_min={}&living_area_max={}",
            self.base_url, bin.min, bin.max
        )
    }

    pub fn page_url(&self, bin: AreaBin, page: u32) -> String {
        format!("{}&page={}", self.bin_url(bin), page)
    }

    /// Number of result pages for `total` hits.
    pub fn page_count(&self, total: u32) -> u32 {
        if self.page_size == 0 {
            return 0;
        }
        total.div_ceil(self.page_size)
    }
}
