use crate::record::{FaceRecord, ID_SEP};

/// All known faces of one photo set, sorted by byte-wise (ordinal)
/// comparison of the face id.
///
/// The ordinal order keeps all faces of one photo in a contiguous block of
/// length `face_count`, which [`FaceCollection::groups_mut`] exploits.
/// Note that `~10` sorts before `~2` ordinally; per-photo contiguity still
/// holds because the block is delimited by the photo id prefix, but the
/// order of faces inside one block is only numeric while face counts stay
/// below 10.
#[derive(Debug, Default)]
pub struct FaceCollection {
    faces: Vec<FaceRecord>,
}

impl FaceCollection {
    /// Wraps and ordinally sorts a set of face records.
    pub fn from_faces(mut faces: Vec<FaceRecord>) -> Self {
        faces.sort_by(|a, b| a.id.cmp(&b.id));
        Self { faces }
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Position of a face id, if present.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.faces.binary_search_by(|f| f.id.as_str().cmp(id)).ok()
    }

    pub fn get(&self, id: &str) -> Option<&FaceRecord> {
        self.position(id).map(|i| &self.faces[i])
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut FaceRecord> {
        self.position(id).map(|i| &mut self.faces[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &FaceRecord> {
        self.faces.iter()
    }

    pub fn faces(&self) -> &[FaceRecord] {
        &self.faces
    }

    pub fn into_faces(self) -> Vec<FaceRecord> {
        self.faces
    }

    /// All faces belonging to one photo, as a mutable slice.
    pub fn photo_faces_mut(&mut self, photo_id: &str) -> &mut [FaceRecord] {
        let mut prefix = String::with_capacity(photo_id.len() + 1);
        prefix.push_str(photo_id);
        prefix.push(ID_SEP);

        let start = self.faces.partition_point(|f| f.id.as_str() < prefix.as_str());
        let mut end = start;
        while end < self.faces.len() && self.faces[end].id.starts_with(&prefix) {
            end += 1;
        }
        &mut self.faces[start..end]
    }

    /// Iterates per-photo groups as mutable slices, in ordinal id order.
    /// Group length comes from the leading face's `face_count`; the no-face
    /// sentinel forms a group of one.
    pub fn groups_mut(&mut self) -> GroupsMut<'_> {
        GroupsMut { rest: &mut self.faces }
    }
}

/// Iterator over contiguous per-photo face groups. See
/// [`FaceCollection::groups_mut`].
pub struct GroupsMut<'a> {
    rest: &'a mut [FaceRecord],
}

impl<'a> Iterator for GroupsMut<'a> {
    type Item = &'a mut [FaceRecord];

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let n = (self.rest[0].face_count.max(1) as usize).min(self.rest.len());
        let rest = std::mem::take(&mut self.rest);
        let (group, tail) = rest.split_at_mut(n);
        self.rest = tail;
        Some(group)
    }
}
