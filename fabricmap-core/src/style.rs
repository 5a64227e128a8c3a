use crate::graph::Category;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fill and stroke colors for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryStyle {
    pub fill: String,
    pub stroke: String,
}

impl CategoryStyle {
    fn new(fill: &str, stroke: &str) -> Self {
        Self {
            fill: fill.to_string(),
            stroke: stroke.to_string(),
        }
    }
}

/// Category to color lookup. Node fills and edge strokes come only from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleTable {
    styles: BTreeMap<Category, CategoryStyle>,
}

impl Default for StyleTable {
    fn default() -> Self {
        let styles = [
            (Category::Root, CategoryStyle::new("#FFE6CC", "#D79B00")),
            (Category::Core, CategoryStyle::new("#D0D0D0", "#CC6600")),
            (Category::Edge, CategoryStyle::new("#E1D5E7", "#9673A6")),
            (Category::Service, CategoryStyle::new("#F8CECC", "#B85450")),
            (Category::InterZone, CategoryStyle::new("#DAE8FC", "#CC0000")),
            (Category::IntraZone, CategoryStyle::new("#D5E8D4", "#0066CC")),
            (Category::Local, CategoryStyle::new("#FFF2CC", "#009900")),
            (Category::Unclassified, CategoryStyle::new("#FFFFFF", "#666666")),
        ];
        Self {
            styles: styles.into_iter().collect(),
        }
    }
}

impl StyleTable {
    pub fn get(&self, category: Category) -> CategoryStyle {
        self.styles
            .get(&category)
            .or_else(|| self.styles.get(&Category::Unclassified))
            .cloned()
            .unwrap_or_else(|| CategoryStyle::new("#FFFFFF", "#666666"))
    }

    pub fn fill(&self, category: Category) -> String {
        self.get(category).fill
    }

    pub fn stroke(&self, category: Category) -> String {
        self.get(category).stroke
    }

    /// Replace the colors of one category, keeping the rest.
    pub fn with_style(mut self, category: Category, style: CategoryStyle) -> Self {
        self.styles.insert(category, style);
        self
    }

    /// Layer `overrides` on top of this table.
    pub fn merged(mut self, overrides: &BTreeMap<Category, CategoryStyle>) -> Self {
        for (category, style) in overrides {
            self.styles.insert(*category, style.clone());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_a_style() {
        let table = StyleTable::default();
        for category in Category::ALL {
            assert!(table.fill(category).starts_with('#'));
            assert!(table.stroke(category).starts_with('#'));
        }
        assert_eq!(table.fill(Category::Root), "#FFE6CC");
        assert_eq!(table.stroke(Category::InterZone), "#CC0000");
    }

    #[test]
    fn test_override_keeps_other_categories() {
        let table = StyleTable::default()
            .with_style(Category::Root, CategoryStyle::new("#000000", "#111111"));
        assert_eq!(table.fill(Category::Root), "#000000");
        assert_eq!(table.fill(Category::Edge), "#E1D5E7");
    }

    #[test]
    fn test_missing_category_falls_back() {
        let table = StyleTable {
            styles: BTreeMap::new(),
        };
        assert_eq!(table.fill(Category::Core), "#FFFFFF");
    }
}
