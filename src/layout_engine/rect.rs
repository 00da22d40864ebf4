use super::{CropValues, Frame, RectValues};

impl CropValues {
    pub fn to_rect(&self, frame: Frame) -> RectValues {
        RectValues {
            x: self.left,
            y: self.top,
            width: frame.width_f64() - self.right - self.left,
            height: frame.height_f64() - self.bottom - self.top,
        }
    }
}

impl RectValues {
    pub fn to_crop(&self, frame: Frame) -> CropValues {
        CropValues {
            left: self.x,
            right: frame.width_f64() - self.x - self.width,
            top: self.y,
            bottom: frame.height_f64() - self.y - self.height,
        }
    }
}

pub fn crops_to_rects(frame: Frame, crops: &[CropValues]) -> Vec<RectValues> {
    crops.iter().map(|crop| crop.to_rect(frame)).collect()
}
