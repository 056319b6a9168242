// number of machine words needed to hold `bytes`, rounding partial words up
pub fn words_for(bytes: u64, word_size: u32) -> u64 {
    debug_assert!(word_size != 0);
    bytes.div_ceil(u64::from(word_size))
}

#[macro_export]
macro_rules! make_type_idx {
    ($vis:vis $type_idx_name:ident, $type_name:ty) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $type_idx_name(u32);

        impl $type_idx_name {
            // panics if `idx` does not fit in u32, use `try_new` for outside input
            $vis fn new(idx: usize) -> $type_idx_name {
                match $type_idx_name::try_new(idx) {
                    Some(idx) => idx,
                    None => panic!("{} {} out of range", stringify!($type_idx_name), idx),
                }
            }

            $vis fn try_new(idx: usize) -> Option<$type_idx_name> {
                u32::try_from(idx).ok().map($type_idx_name)
            }

            $vis fn from_push(vec: &mut Vec<$type_name>, val: $type_name) -> $type_idx_name {
                let idx = $type_idx_name::new(vec.len());
                vec.push(val);
                idx
            }

            $vis fn get_inner(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $type_idx_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::ops::Index<$type_idx_name> for [$type_name] {
            type Output = $type_name;

            fn index(&self, index: $type_idx_name) -> &Self::Output {
                &self[index.0 as usize]
            }
        }

        impl std::ops::IndexMut<$type_idx_name> for [$type_name] {
            fn index_mut(&mut self, index: $type_idx_name) -> &mut Self::Output {
                &mut self[index.0 as usize]
            }
        }

        impl std::ops::Index<$type_idx_name> for Vec<$type_name> {
            type Output = $type_name;

            fn index(&self, index: $type_idx_name) -> &Self::Output {
                &self.as_slice()[index]
            }
        }

        impl std::ops::IndexMut<$type_idx_name> for Vec<$type_name> {
            fn index_mut(&mut self, index: $type_idx_name) -> &mut Self::Output {
                &mut self.as_mut_slice()[index]
            }
        }
    };
}
