use plate_batch_types::ImageHandle;

/// One submission: the staged image plus recognition hints.
#[derive(Debug)]
pub struct RecognitionRequest {
    image: ImageHandle,
    regions: Vec<String>,
    camera_id: Option<String>,
    mmc: bool,
}

impl RecognitionRequest {
    pub fn new(image: ImageHandle) -> Self {
        Self {
            image,
            regions: Vec::new(),
            camera_id: None,
            mmc: false,
        }
    }

    /// Region hints narrow plate-pattern matching to specific jurisdictions;
    /// order is preserved on the wire.
    pub fn with_regions(mut self, regions: Vec<String>) -> Self {
        self.regions = regions;
        self
    }

    pub fn with_camera_id(mut self, camera_id: Option<String>) -> Self {
        self.camera_id = camera_id;
        self
    }

    /// Make/model/color prediction, honored by the self-hosted SDK only.
    pub fn with_mmc(mut self, mmc: bool) -> Self {
        self.mmc = mmc;
        self
    }

    pub fn image(&self) -> &ImageHandle {
        &self.image
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn camera_id(&self) -> Option<&str> {
        self.camera_id.as_deref()
    }

    pub fn mmc(&self) -> bool {
        self.mmc
    }
}
