use crate::errors::*;
use crate::raster::RasterBand;

/// The reduced resolution levels of a band, index `0` being the highest resolution.
///
/// Nothing is cached: every call asks the band again, so the collection follows
/// overviews built after it was created and fails once the dataset is closed.
#[derive(Debug, Clone)]
pub struct Overviews {
    band: RasterBand,
}

impl Overviews {
    pub(crate) fn new(band: RasterBand) -> Self {
        Overviews { band }
    }

    pub fn count(&self) -> Result<usize> {
        self.band.overview_count()
    }

    /// Fails with [`RasterError::OutOfRange`] when `index >= count()`.
    pub fn get(&self, index: usize) -> Result<RasterBand> {
        self.band.overview(index)
    }

    /// Call `f` with each overview and its index, in index order.
    pub fn for_each<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(RasterBand, usize) -> Result<()>,
    {
        for index in 0..self.count()? {
            f(self.get(index)?, index)?;
        }
        Ok(())
    }

    /// Collect `f` applied to each overview and its index.
    pub fn map<F, R>(&self, mut f: F) -> Result<Vec<R>>
    where
        F: FnMut(RasterBand, usize) -> Result<R>,
    {
        let mut out = Vec::new();
        self.for_each(|band, index| {
            out.push(f(band, index)?);
            Ok(())
        })?;
        Ok(out)
    }

    /// Iterate over the overviews. The count is taken once, when iteration starts.
    pub fn iter(&self) -> Result<OverviewIterator<'_>> {
        Ok(OverviewIterator {
            overviews: self,
            next: 0,
            count: self.count()?,
        })
    }
}

pub struct OverviewIterator<'a> {
    overviews: &'a Overviews,
    next: usize,
    count: usize,
}

impl Iterator for OverviewIterator<'_> {
    type Item = Result<RasterBand>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let item = self.overviews.get(self.next);
        self.next += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.count - self.next;
        (rest, Some(rest))
    }
}
