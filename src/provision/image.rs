//! Boot image resolution.
//!
//! Given an optional user value the resolver picks exactly one image:
//! - nothing: the newest catalog image for the operating system, version and shape
//! - an image OCID: that image, after checking it exists in the region
//! - anything else: a display name, matched exactly first and then by
//!   substring among the newest catalog images

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::config::DeployInputs;
use crate::error::{ImageError, Result};
use crate::oci::{Image, ImageCatalog, ImageQuery};

/// Prefix that marks a value as an image OCID rather than a display name.
pub const IMAGE_OCID_PREFIX: &str = "ocid1.image.";

/// How an image was selected.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    /// Newest catalog image matching the operating system filter.
    LatestCatalog,
    /// OCID supplied by the user.
    ExplicitId,
    /// Exact display-name lookup.
    DisplayName,
    /// Display name found among the newest catalog images.
    DisplayNameSearch,
}

impl fmt::Display for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LatestCatalog => write!(f, "latest catalog image"),
            Self::ExplicitId => write!(f, "image OCID"),
            Self::DisplayName => write!(f, "display name"),
            Self::DisplayNameSearch => write!(f, "display name search"),
        }
    }
}

/// The image selected for the instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedImage {
    /// Image OCID.
    pub id: String,
    /// Display name, when known.
    pub display_name: Option<String>,
    /// How the image was selected.
    pub source: ImageSource,
}

/// Resolves the boot image against an image catalog.
#[derive(Debug)]
pub struct ImageResolver<'a, C: ?Sized> {
    catalog: &'a C,
    inputs: &'a DeployInputs,
}

impl<'a, C> ImageResolver<'a, C>
where
    C: ImageCatalog + ?Sized,
{
    /// Creates a resolver.
    #[must_use]
    pub const fn new(catalog: &'a C, inputs: &'a DeployInputs) -> Self {
        Self { catalog, inputs }
    }

    /// Resolves the image requested in the inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if no image matches; the error names the input.
    pub async fn resolve(&self) -> Result<ResolvedImage> {
        let resolved = match self.inputs.image.as_deref() {
            None => self.latest().await?,
            Some(id) if id.starts_with(IMAGE_OCID_PREFIX) => self.by_id(id).await?,
            Some(name) => self.by_display_name(name).await?,
        };

        info!(
            "Using image {} ({}) from {}",
            resolved.id,
            resolved.display_name.as_deref().unwrap_or("unnamed"),
            resolved.source
        );
        Ok(resolved)
    }

    /// Lists the newest images matching the operating system filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    pub async fn list_latest(&self, limit: u32) -> Result<Vec<Image>> {
        let mut images = self.catalog.list_images(&self.filtered_query(limit)).await?;
        images.sort_by(|a, b| b.time_created.cmp(&a.time_created));
        Ok(images)
    }

    async fn latest(&self) -> Result<ResolvedImage> {
        let filter = &self.inputs.image_filter;
        let image = self.list_latest(1).await?.into_iter().next().ok_or_else(|| {
            ImageError::NoCatalogImage {
                operating_system: filter.operating_system.clone(),
                operating_system_version: filter.operating_system_version.clone(),
                shape: filter.shape.clone(),
            }
        })?;

        Ok(ResolvedImage {
            id: image.id,
            display_name: Some(image.display_name),
            source: ImageSource::LatestCatalog,
        })
    }

    async fn by_id(&self, image_id: &str) -> Result<ResolvedImage> {
        debug!("Checking image {image_id} exists");
        let image = self.catalog.get_image(image_id).await?.ok_or_else(|| {
            ImageError::ImageIdNotFound {
                image_id: image_id.to_string(),
                region: self.inputs.region.clone(),
            }
        })?;

        Ok(ResolvedImage {
            id: image_id.to_string(),
            display_name: Some(image.display_name),
            source: ImageSource::ExplicitId,
        })
    }

    async fn by_display_name(&self, name: &str) -> Result<ResolvedImage> {
        let exact = ImageQuery {
            compartment_id: self.inputs.compartment_id.clone(),
            display_name: Some(name.to_string()),
            ..ImageQuery::default()
        };
        let exact_matches = self.catalog.list_images(&exact).await?;

        if let Some(image) = exact_matches.into_iter().max_by_key(|i| i.time_created) {
            return Ok(ResolvedImage {
                id: image.id,
                display_name: Some(image.display_name),
                source: ImageSource::DisplayName,
            });
        }

        debug!("No exact match for '{name}', searching the newest catalog images");
        let candidates = self.list_latest(self.inputs.image_search_limit).await?;

        let filter = &self.inputs.image_filter;
        let image = pick_by_display_name(&candidates, name).ok_or_else(|| {
            ImageError::DisplayNameUnresolved {
                display_name: name.to_string(),
                operating_system: filter.operating_system.clone(),
                operating_system_version: filter.operating_system_version.clone(),
                shape: filter.shape.clone(),
            }
        })?;

        Ok(ResolvedImage {
            id: image.id.clone(),
            display_name: Some(image.display_name.clone()),
            source: ImageSource::DisplayNameSearch,
        })
    }

    fn filtered_query(&self, limit: u32) -> ImageQuery {
        let filter = &self.inputs.image_filter;
        ImageQuery {
            compartment_id: self.inputs.compartment_id.clone(),
            operating_system: Some(filter.operating_system.clone()),
            operating_system_version: Some(filter.operating_system_version.clone()),
            shape: Some(filter.shape.clone()),
            display_name: None,
            limit: Some(limit),
        }
    }
}

/// Picks the image whose display name equals `name`, or else the first whose
/// display name contains it. `images` must be ordered newest first.
#[must_use]
pub fn pick_by_display_name<'i>(images: &'i [Image], name: &str) -> Option<&'i Image> {
    images
        .iter()
        .find(|image| image.display_name == name)
        .or_else(|| images.iter().find(|image| image.display_name.contains(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployConfig;
    use crate::error::RonzzError;
    use crate::oci::fake::{day, image};
    use async_trait::async_trait;
    use mockall::mock;
    use mockall::predicate::always;
    use std::path::Path;

    mock! {
        pub Catalog {}

        #[async_trait]
        impl ImageCatalog for Catalog {
            async fn list_images(&self, query: &ImageQuery) -> Result<Vec<Image>>;
            async fn get_image(&self, image_id: &str) -> Result<Option<Image>>;
        }
    }

    fn inputs(image_value: Option<&str>) -> DeployInputs {
        let mut config = DeployConfig::default();
        config.oci.compartment_id = Some(String::from("ocid1.compartment.x"));
        config.oci.availability_domain = Some(String::from("AD-1"));
        config.oci.ssh_public_key = Some(String::from("ssh-rsa AAAA..."));
        config.image.id = image_value.map(String::from);
        DeployInputs::resolve(&config, "eu-frankfurt-1", Path::new(".")).unwrap()
    }

    fn catalog() -> Vec<Image> {
        vec![
            image("ocid1.image.old", "Canonical-Ubuntu-24.04-aarch64-2024.06.26-0", day(6, 26)),
            image("ocid1.image.new", "Canonical-Ubuntu-24.04-aarch64-2024.10.08-0", day(10, 8)),
            image("ocid1.image.mid", "Canonical-Ubuntu-24.04-Minimal-aarch64-2024.08.01-0", day(8, 1)),
        ]
    }

    #[tokio::test]
    async fn test_no_input_picks_newest_filtered_image() {
        let mut mock = MockCatalog::new();
        mock.expect_list_images()
            .withf(|q| {
                q.operating_system.as_deref() == Some("Canonical Ubuntu")
                    && q.operating_system_version.as_deref() == Some("24.04")
                    && q.shape.as_deref() == Some("VM.Standard.A1.Flex")
                    && q.display_name.is_none()
            })
            .times(1)
            .returning(|_| Ok(catalog()));

        let inputs = inputs(None);
        let resolved = ImageResolver::new(&mock, &inputs).resolve().await.unwrap();

        assert_eq!(resolved.id, "ocid1.image.new");
        assert_eq!(resolved.source, ImageSource::LatestCatalog);
    }

    #[tokio::test]
    async fn test_empty_catalog_fails_with_filter() {
        let mut mock = MockCatalog::new();
        mock.expect_list_images().returning(|_| Ok(Vec::new()));

        let inputs = inputs(None);
        let err = ImageResolver::new(&mock, &inputs).resolve().await.unwrap_err();

        assert!(matches!(err, RonzzError::Image(ImageError::NoCatalogImage { .. })));
        let message = err.to_string();
        assert!(message.contains("Canonical Ubuntu"));
        assert!(message.contains("VM.Standard.A1.Flex"));
    }

    #[tokio::test]
    async fn test_ocid_input_is_checked_and_used_unchanged() {
        let mut mock = MockCatalog::new();
        mock.expect_get_image()
            .withf(|id| id == "ocid1.image.oc1.eu-frankfurt-1.custom")
            .times(1)
            .returning(|id| Ok(Some(image(id, "my-custom-image", day(1, 1)))));
        mock.expect_list_images().never();

        let inputs = inputs(Some("ocid1.image.oc1.eu-frankfurt-1.custom"));
        let resolved = ImageResolver::new(&mock, &inputs).resolve().await.unwrap();

        assert_eq!(resolved.id, "ocid1.image.oc1.eu-frankfurt-1.custom");
        assert_eq!(resolved.source, ImageSource::ExplicitId);
    }

    #[tokio::test]
    async fn test_missing_ocid_names_id_and_region() {
        let mut mock = MockCatalog::new();
        mock.expect_get_image().with(always()).returning(|_| Ok(None));

        let inputs = inputs(Some("ocid1.image.oc1..missing"));
        let err = ImageResolver::new(&mock, &inputs).resolve().await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("ocid1.image.oc1..missing"));
        assert!(message.contains("eu-frankfurt-1"));
    }

    #[tokio::test]
    async fn test_exact_display_name_match() {
        let mut mock = MockCatalog::new();
        mock.expect_list_images()
            .withf(|q| q.display_name.as_deref() == Some("Canonical-Ubuntu-24.04-aarch64-2024.06.26-0"))
            .times(1)
            .returning(|q| {
                let name = q.display_name.clone().unwrap_or_default();
                Ok(catalog().into_iter().filter(|i| i.display_name == name).collect())
            });

        let inputs = inputs(Some("Canonical-Ubuntu-24.04-aarch64-2024.06.26-0"));
        let resolved = ImageResolver::new(&mock, &inputs).resolve().await.unwrap();

        assert_eq!(resolved.id, "ocid1.image.old");
        assert_eq!(resolved.source, ImageSource::DisplayName);
    }

    #[tokio::test]
    async fn test_substring_fallback() {
        let mut mock = MockCatalog::new();
        mock.expect_list_images()
            .withf(|q| q.display_name.is_some())
            .returning(|_| Ok(Vec::new()));
        mock.expect_list_images()
            .withf(|q| q.display_name.is_none() && q.limit == Some(50))
            .times(1)
            .returning(|_| Ok(catalog()));

        let inputs = inputs(Some("Minimal"));
        let resolved = ImageResolver::new(&mock, &inputs).resolve().await.unwrap();

        assert_eq!(resolved.id, "ocid1.image.mid");
        assert_eq!(resolved.source, ImageSource::DisplayNameSearch);
    }

    #[tokio::test]
    async fn test_unresolvable_display_name() {
        let mut mock = MockCatalog::new();
        mock.expect_list_images().returning(|q| {
            Ok(if q.display_name.is_some() { Vec::new() } else { catalog() })
        });

        let inputs = inputs(Some("Oracle-Linux-9"));
        let err = ImageResolver::new(&mock, &inputs).resolve().await.unwrap_err();

        assert!(matches!(
            err,
            RonzzError::Image(ImageError::DisplayNameUnresolved { ref display_name, .. })
                if display_name == "Oracle-Linux-9"
        ));
        assert!(err.to_string().contains("Oracle-Linux-9"));
    }

    #[test]
    fn test_exact_match_beats_newer_substring_match() {
        let images = vec![
            image("ocid1.image.a", "ubuntu-base-extended", day(10, 1)),
            image("ocid1.image.b", "ubuntu-base", day(9, 1)),
        ];

        assert_eq!(pick_by_display_name(&images, "ubuntu-base").map(|i| i.id.as_str()), Some("ocid1.image.b"));
        assert_eq!(pick_by_display_name(&images, "extended").map(|i| i.id.as_str()), Some("ocid1.image.a"));
        assert!(pick_by_display_name(&images, "fedora").is_none());
    }
}
