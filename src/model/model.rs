use crate::engine::Operator;
use crate::error::*;
use crate::model::*;
use crate::util::*;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MediumKind {
    Acoustic,
    Elastic,
}

/// Physical parameters of the medium.
/// Units: squared slowness in s²/km², velocities in km/s, density in g/cm³.
#[derive(Debug, Clone, PartialEq)]
pub enum Medium<const GRID_DIMENSION: usize> {
    Acoustic {
        m: PhysicalParameter<GRID_DIMENSION>,
        rho: Option<PhysicalParameter<GRID_DIMENSION>>,
    },
    Elastic {
        vp: PhysicalParameter<GRID_DIMENSION>,
        vs: PhysicalParameter<GRID_DIMENSION>,
        rho: PhysicalParameter<GRID_DIMENSION>,
    },
}

/// Which side's wavefield energy should be accumulated during propagation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum IlluminationSide {
    Source,
    Receiver,
    Both,
}

impl IlluminationSide {
    pub fn covers(&self, operator: Operator) -> bool {
        match self {
            IlluminationSide::Both => true,
            IlluminationSide::Source => matches!(
                operator,
                Operator::Forward | Operator::Born | Operator::AdjointBorn
            ),
            IlluminationSide::Receiver => {
                matches!(operator, Operator::Adjoint | Operator::AdjointBorn)
            }
        }
    }
}

/// Full-domain model owned by the caller.
/// Windowing always produces a new, independent model.
#[derive(Debug, Clone, PartialEq)]
pub struct Model<const GRID_DIMENSION: usize> {
    grid: Grid<GRID_DIMENSION>,
    /// Absorbing boundary width in grid points, added on every side.
    nb: usize,
    medium: Medium<GRID_DIMENSION>,
    illumination: Option<IlluminationSide>,
}

impl<const GRID_DIMENSION: usize> Model<GRID_DIMENSION> {
    /// Acoustic model from squared slowness.
    pub fn acoustic(m: PhysicalParameter<GRID_DIMENSION>, nb: usize) -> Result<Self> {
        if m.min_value() <= 0.0 {
            return Err(SeisError::dimension(
                "squared slowness",
                "strictly positive values",
                m.min_value(),
            ));
        }
        Ok(Model {
            grid: *m.grid(),
            nb,
            medium: Medium::Acoustic { m, rho: None },
            illumination: None,
        })
    }

    /// Acoustic model from a velocity field in km/s.
    pub fn acoustic_from_velocity(
        vp: &PhysicalParameter<GRID_DIMENSION>,
        nb: usize,
    ) -> Result<Self> {
        if vp.min_value() <= 0.0 {
            return Err(SeisError::dimension(
                "velocity",
                "strictly positive values",
                vp.min_value(),
            ));
        }
        let m = PhysicalParameter::from_vec(
            *vp.grid(),
            vp.data().iter().map(|v| 1.0 / (v * v)).collect(),
        )?;
        Self::acoustic(m, nb)
    }

    pub fn elastic(
        vp: PhysicalParameter<GRID_DIMENSION>,
        vs: PhysicalParameter<GRID_DIMENSION>,
        rho: PhysicalParameter<GRID_DIMENSION>,
        nb: usize,
    ) -> Result<Self> {
        vs.check_shape("shear velocity", vp.shape())?;
        rho.check_shape("density", vp.shape())?;
        Ok(Model {
            grid: *vp.grid(),
            nb,
            medium: Medium::Elastic { vp, vs, rho },
            illumination: None,
        })
    }

    /// Attach a density field to an acoustic model.
    pub fn with_density(mut self, density: PhysicalParameter<GRID_DIMENSION>) -> Result<Self> {
        density.check_shape("density", self.grid.shape())?;
        match &mut self.medium {
            Medium::Acoustic { rho, .. } => {
                *rho = Some(density);
                Ok(self)
            }
            Medium::Elastic { .. } => Err(SeisError::dimension(
                "density attachment",
                MediumKind::Acoustic,
                MediumKind::Elastic,
            )),
        }
    }

    pub fn with_illumination(mut self, side: IlluminationSide) -> Self {
        self.illumination = Some(side);
        self
    }

    pub fn grid(&self) -> &Grid<GRID_DIMENSION> {
        &self.grid
    }

    pub fn nb(&self) -> usize {
        self.nb
    }

    pub fn medium(&self) -> &Medium<GRID_DIMENSION> {
        &self.medium
    }

    pub fn illumination(&self) -> Option<IlluminationSide> {
        self.illumination
    }

    pub fn kind(&self) -> MediumKind {
        match self.medium {
            Medium::Acoustic { .. } => MediumKind::Acoustic,
            Medium::Elastic { .. } => MediumKind::Elastic,
        }
    }

    pub fn is_elastic(&self) -> bool {
        self.kind() == MediumKind::Elastic
    }

    /// Fastest wave speed anywhere in the model, km/s.
    pub fn max_velocity(&self) -> f64 {
        match &self.medium {
            Medium::Acoustic { m, .. } => (1.0 / m.min_value()).sqrt(),
            Medium::Elastic { vp, .. } => vp.max_value(),
        }
    }

    /// Largest stable time step in ms for spacing in m and velocity in km/s.
    pub fn critical_dt(&self) -> f64 {
        let coefficient = if GRID_DIMENSION == 3 { 0.42 } else { 0.38 };
        coefficient * self.grid.min_spacing() / self.max_velocity()
    }

    /// Independent model restricted to an index box of this grid.
    pub fn crop(&self, aabb: &AABB<GRID_DIMENSION>) -> Self {
        let medium = match &self.medium {
            Medium::Acoustic { m, rho } => Medium::Acoustic {
                m: m.crop(aabb),
                rho: rho.as_ref().map(|r| r.crop(aabb)),
            },
            Medium::Elastic { vp, vs, rho } => Medium::Elastic {
                vp: vp.crop(aabb),
                vs: vs.crop(aabb),
                rho: rho.crop(aabb),
            },
        };
        Model {
            grid: self.grid.sub_grid(aabb),
            nb: self.nb,
            medium,
            illumination: self.illumination,
        }
    }
}
